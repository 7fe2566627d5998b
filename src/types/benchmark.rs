use serde::{Deserialize, Serialize};

use super::common::check_finite;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ComparisonMetric {
    pub metric: String,
    #[serde(rename = "supplier")]
    pub subject_value: f64,
    #[serde(rename = "industry")]
    pub industry_value: f64,
}

/// Peer benchmark for the subject's score.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RiskBenchmark {
    #[serde(rename = "supplier_score")]
    pub subject_value: f64,
    pub industry_average: f64,
    #[serde(rename = "top_percentile")]
    pub top_percentile_value: f64,
    #[serde(rename = "bottom_percentile")]
    pub bottom_percentile_value: f64,
    #[serde(default)]
    pub comparison_metrics: Vec<ComparisonMetric>,
}

impl RiskBenchmark {
    pub fn validate(&self) -> Result<(), String> {
        check_finite("supplier_score", self.subject_value)?;
        check_finite("industry_average", self.industry_average)?;
        check_finite("top_percentile", self.top_percentile_value)?;
        check_finite("bottom_percentile", self.bottom_percentile_value)?;
        for m in &self.comparison_metrics {
            check_finite(&format!("{} supplier", m.metric), m.subject_value)?;
            check_finite(&format!("{} industry", m.metric), m.industry_value)?;
        }
        Ok(())
    }

    /// Subject score minus the industry average (positive = riskier than peers).
    pub fn gap_to_industry(&self) -> f64 {
        self.subject_value - self.industry_average
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_and_gap() {
        let raw = r#"{
            "supplier_score": 62,
            "industry_average": 55,
            "top_percentile": 20,
            "bottom_percentile": 85,
            "comparison_metrics": [
                {"metric": "Certificate Health", "supplier": 70, "industry": 65}
            ]
        }"#;
        let bench: RiskBenchmark = serde_json::from_str(raw).unwrap();
        assert!(bench.validate().is_ok());
        assert_eq!(bench.gap_to_industry(), 7.0);
        assert_eq!(bench.comparison_metrics[0].industry_value, 65.0);
    }

    #[test]
    fn test_missing_metrics_default_empty() {
        let raw = r#"{"supplier_score": 1, "industry_average": 2,
                      "top_percentile": 3, "bottom_percentile": 4}"#;
        let bench: RiskBenchmark = serde_json::from_str(raw).unwrap();
        assert!(bench.comparison_metrics.is_empty());
    }
}
