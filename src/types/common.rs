//! Common shared types used across risk payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Three-step severity scale.
/// Used for the score's level, a driver's impact and a mitigation's priority.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("low"),
            RiskLevel::Medium => f.write_str("medium"),
            RiskLevel::High => f.write_str("high"),
        }
    }
}

/// Direction of the score relative to the prior period.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for RiskTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTrend::Increasing => f.write_str("increasing"),
            RiskTrend::Decreasing => f.write_str("decreasing"),
            RiskTrend::Stable => f.write_str("stable"),
        }
    }
}

pub(crate) fn check_finite(field: &str, value: f64) -> Result<(), String> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(format!("{field} must be a finite number, got {value}"))
    }
}

pub(crate) fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), String> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(format!("{field} must be in [{min}, {max}], got {value}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_wire_format() {
        let level: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(level, RiskLevel::Medium);
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
        assert!(serde_json::from_str::<RiskLevel>("\"severe\"").is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("weight", 0.5, 0.0, 1.0).is_ok());
        assert!(check_range("weight", 1.5, 0.0, 1.0).is_err());
        assert!(check_range("weight", f64::NAN, 0.0, 1.0).is_err());
    }
}
