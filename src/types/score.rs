//! Current risk score and its drivers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{check_finite, check_range, RiskLevel, RiskTrend};
use crate::consts::MAX_RISK_SCORE;
use crate::serde_utils::lenient_timestamp;

/// A single factor contributing to the score.
///
/// `rank` is informational; ordering for derived views is by `weight`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RiskDriver {
    #[serde(default)]
    pub rank: u32,
    pub factor: String,
    /// Relative weight in `[0, 1]`. Weights need not sum to 1.
    pub weight: f64,
    #[serde(default)]
    pub description: String,
    pub impact: RiskLevel,
    #[serde(rename = "action", default)]
    pub recommended_action: String,
    #[serde(rename = "action_url", default)]
    pub action_reference: String,
    /// Raw observed value behind the factor, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Component scores on the same 0-100 scale as the headline value.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SubScores {
    pub certificate_health: f64,
    pub audit_performance: f64,
    pub financial_stability: f64,
    pub regulatory_compliance: f64,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RiskScore {
    /// Headline score in `[0, 100]`.
    #[serde(rename = "risk_score")]
    pub value: f64,
    #[serde(rename = "risk_level")]
    pub level: RiskLevel,
    #[serde(rename = "last_updated", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub drivers: Vec<RiskDriver>,
    pub sub_scores: SubScores,
    pub trend: RiskTrend,
    #[serde(rename = "change_from_last_month", default)]
    pub change_from_prior_period: f64,
    #[serde(rename = "industry_benchmark")]
    pub industry_benchmark_value: f64,
}

impl RiskScore {
    /// Check the invariants the backend is trusted for nowhere else.
    pub fn validate(&self) -> Result<(), String> {
        check_range("risk_score", self.value, 0.0, MAX_RISK_SCORE)?;
        check_range(
            "industry_benchmark",
            self.industry_benchmark_value,
            0.0,
            MAX_RISK_SCORE,
        )?;
        check_finite("change_from_last_month", self.change_from_prior_period)?;

        let subs = &self.sub_scores;
        for (name, v) in [
            ("sub_scores.certificate_health", subs.certificate_health),
            ("sub_scores.audit_performance", subs.audit_performance),
            ("sub_scores.financial_stability", subs.financial_stability),
            ("sub_scores.regulatory_compliance", subs.regulatory_compliance),
        ] {
            check_range(name, v, 0.0, MAX_RISK_SCORE)?;
        }

        for driver in &self.drivers {
            if driver.factor.trim().is_empty() {
                return Err("driver factor must not be empty".to_string());
            }
            check_range(&format!("driver '{}' weight", driver.factor), driver.weight, 0.0, 1.0)?;
        }
        Ok(())
    }
}
