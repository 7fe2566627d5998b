use serde::{Deserialize, Serialize};

use super::common::RiskLevel;

/// A recommended action against one risk factor.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RiskMitigation {
    pub risk_factor: String,
    /// Whatever the backend reports as the factor's current value (number, string, object).
    #[serde(default)]
    pub current_value: serde_json::Value,
    pub recommendation: String,
    pub priority: RiskLevel,
    #[serde(rename = "action_url", default)]
    pub action_reference: String,
}

impl RiskMitigation {
    pub fn validate(&self) -> Result<(), String> {
        if self.risk_factor.trim().is_empty() {
            return Err("mitigation risk_factor must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_value_is_untyped() {
        let raw = r#"[
            {"risk_factor": "Expiry", "current_value": 12, "recommendation": "Renew",
             "priority": "high", "action_url": "/certificates"},
            {"risk_factor": "Audit", "current_value": "2 failures", "recommendation": "Re-audit",
             "priority": "low"}
        ]"#;
        let items: Vec<RiskMitigation> = serde_json::from_str(raw).unwrap();
        assert_eq!(items[0].current_value, serde_json::json!(12));
        assert_eq!(items[1].current_value, serde_json::json!("2 failures"));
        assert_eq!(items[1].action_reference, "");
        assert!(items.iter().all(|m| m.validate().is_ok()));
    }
}
