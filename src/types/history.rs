use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::check_range;
use crate::consts::MAX_RISK_SCORE;
use crate::serde_utils::{lenient_timestamp, null_as_empty};

/// One historical sample of the headline score.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RiskHistoryPoint {
    #[serde(
        rename = "date",
        alias = "calculated_at",
        deserialize_with = "lenient_timestamp"
    )]
    pub observed_at: DateTime<Utc>,
    #[serde(rename = "risk_score", alias = "score")]
    pub value: f64,
}

/// Envelope returned by the history endpoint.
#[derive(Deserialize, Debug)]
pub struct RiskHistoryResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub history: Vec<RiskHistoryPoint>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub period_days: Option<u32>,
}

impl RiskHistoryPoint {
    pub fn validate(&self) -> Result<(), String> {
        check_range("history risk_score", self.value, 0.0, MAX_RISK_SCORE)
    }
}

/// Order a series ascending by observation time, keeping arrival order on ties.
pub fn sort_history(points: &mut [RiskHistoryPoint]) {
    points.sort_by(|a, b| a.observed_at.cmp(&b.observed_at));
}
