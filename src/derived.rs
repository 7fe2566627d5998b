//! Views computed from a [`ProfileSnapshot`].
//!
//! Nothing here is cached: every call reads the slots it is given, so a view
//! can never disagree with the data it was derived from.

use std::cmp::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::consts::{LOW_RISK_UPPER_BOUND, MEDIUM_RISK_UPPER_BOUND};
use crate::fetcher::ResourceKind;
use crate::orchestrator::ProfileSnapshot;
use crate::slot::SlotStatus;
use crate::types::{RiskDriver, RiskLevel, RiskTrend};

/// Drivers of the current score ordered by descending weight, at most `n`.
///
/// Equal weights keep backend order. Empty when there is no score.
pub fn top_drivers(snapshot: &ProfileSnapshot, n: usize) -> Vec<RiskDriver> {
    let Some(score) = snapshot.score.data() else {
        return Vec::new();
    };
    let mut drivers = score.drivers.clone();
    drivers.sort_by(|a, b| by_weight_desc(a.weight, b.weight));
    drivers.truncate(n);
    drivers
}

fn by_weight_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

pub fn current_trend(snapshot: &ProfileSnapshot) -> Option<RiskTrend> {
    snapshot.score.data().map(|score| score.trend)
}

/// Bucket a 0-100 value into a level.
///
/// `[0, 30)` is low, `[30, 60)` medium, the rest high, matching the backend's
/// `risk_level`. NaN has no level.
pub fn bucket_level(value: f64) -> Option<RiskLevel> {
    if value.is_nan() {
        None
    } else if value < LOW_RISK_UPPER_BOUND {
        Some(RiskLevel::Low)
    } else if value < MEDIUM_RISK_UPPER_BOUND {
        Some(RiskLevel::Medium)
    } else {
        Some(RiskLevel::High)
    }
}

/// Level for `value`, or for the current score when `value` is `None`.
pub fn level_for(snapshot: &ProfileSnapshot, value: Option<f64>) -> Option<RiskLevel> {
    let value = value.or_else(|| snapshot.score.data().map(|score| score.value))?;
    bucket_level(value)
}

/// True when the score was never populated or is older than `max_age` at `now`.
pub fn is_stale(snapshot: &ProfileSnapshot, max_age: Duration, now: DateTime<Utc>) -> bool {
    let Some(updated) = snapshot.score.last_updated_at() else {
        return true;
    };
    match (now - updated).to_std() {
        Ok(age) => age > max_age,
        // Updated in the future (clock skew): fresh.
        Err(_) => false,
    }
}

pub fn is_loading(snapshot: &ProfileSnapshot) -> bool {
    ResourceKind::ALL
        .iter()
        .any(|kind| snapshot.status(*kind) == SlotStatus::Loading)
}

/// `(timestamp, value)` pairs for charting, ascending by time.
pub fn history_series(snapshot: &ProfileSnapshot) -> Vec<(DateTime<Utc>, f64)> {
    snapshot
        .history
        .data()
        .map(|points| points.iter().map(|p| (p.observed_at, p.value)).collect())
        .unwrap_or_default()
}

/// Mean of the loaded history, `None` when empty or not loaded.
pub fn average_history_value(snapshot: &ProfileSnapshot) -> Option<f64> {
    let points = snapshot.history.data()?;
    if points.is_empty() {
        return None;
    }
    let sum: f64 = points.iter().map(|p| p.value).sum();
    Some(sum / points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::ResourceSlot;
    use crate::types::fixtures::{driver, score};
    use crate::types::RiskHistoryPoint;
    use chrono::TimeZone;

    fn with_score(value: f64, drivers: Vec<RiskDriver>) -> ProfileSnapshot {
        let mut snapshot = ProfileSnapshot::default();
        snapshot.score.begin_loading();
        snapshot
            .score
            .succeed(score(value, drivers), Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        snapshot
    }

    // =========================================================================
    // top_drivers
    // =========================================================================

    #[test]
    fn test_top_drivers_by_weight() {
        let snapshot = with_score(
            40.0,
            vec![driver("A", 0.5), driver("B", 0.3), driver("C", 0.2)],
        );
        let top = top_drivers(&snapshot, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].factor, "A");

        let factors: Vec<_> = top_drivers(&snapshot, 10)
            .into_iter()
            .map(|d| d.factor)
            .collect();
        assert_eq!(factors, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_top_drivers_unsorted_input_and_ties() {
        let snapshot = with_score(
            40.0,
            vec![
                driver("low", 0.1),
                driver("tie1", 0.4),
                driver("high", 0.9),
                driver("tie2", 0.4),
            ],
        );
        let factors: Vec<_> = top_drivers(&snapshot, 3)
            .into_iter()
            .map(|d| d.factor)
            .collect();
        assert_eq!(factors, vec!["high", "tie1", "tie2"]);
    }

    #[test]
    fn test_top_drivers_without_score() {
        assert!(top_drivers(&ProfileSnapshot::default(), 5).is_empty());
        assert!(top_drivers(&with_score(10.0, vec![driver("A", 0.5)]), 0).is_empty());
    }

    #[test]
    fn test_top_drivers_sorted_and_bounded_for_generated_inputs() {
        // Small LCG so the case set is deterministic.
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as f64 / (1u64 << 31) as f64
        };

        for case in 0..50 {
            let count = case % 9;
            let drivers: Vec<_> = (0..count)
                .map(|i| driver(&format!("f{i}"), next()))
                .collect();
            let snapshot = with_score(50.0, drivers);
            for n in [0, 1, 3, 10] {
                let top = top_drivers(&snapshot, n);
                assert_eq!(top.len(), n.min(count));
                assert!(top.windows(2).all(|w| w[0].weight >= w[1].weight));
            }
        }
    }

    // =========================================================================
    // Levels, trend, staleness
    // =========================================================================

    #[test]
    fn test_bucket_level_boundaries() {
        assert_eq!(bucket_level(0.0), Some(RiskLevel::Low));
        assert_eq!(bucket_level(29.9), Some(RiskLevel::Low));
        assert_eq!(bucket_level(30.0), Some(RiskLevel::Medium));
        assert_eq!(bucket_level(59.9), Some(RiskLevel::Medium));
        assert_eq!(bucket_level(60.0), Some(RiskLevel::High));
        assert_eq!(bucket_level(100.0), Some(RiskLevel::High));
        assert_eq!(bucket_level(f64::NAN), None);
    }

    #[test]
    fn test_level_for_defaults_to_current_score() {
        assert_eq!(level_for(&ProfileSnapshot::default(), None), None);
        let snapshot = with_score(72.0, vec![]);
        assert_eq!(level_for(&snapshot, None), Some(RiskLevel::High));
        assert_eq!(level_for(&snapshot, Some(12.0)), Some(RiskLevel::Low));
    }

    #[test]
    fn test_level_for_agrees_with_backend_level() {
        for (value, level) in [
            (12.0, "low"),
            (31.0, "medium"),
            (59.0, "medium"),
            (62.0, "high"),
            (65.0, "high"),
        ] {
            let raw = format!(
                r#"{{
                    "risk_score": {value},
                    "risk_level": "{level}",
                    "last_updated": "2024-06-01T12:00:00",
                    "sub_scores": {{"certificate_health": 50, "audit_performance": 50,
                                   "financial_stability": 50, "regulatory_compliance": 50}},
                    "trend": "stable",
                    "industry_benchmark": 50
                }}"#
            );
            let decoded: crate::types::RiskScore = serde_json::from_str(&raw).unwrap();
            let expected = decoded.level;
            let mut snapshot = ProfileSnapshot::default();
            snapshot.score.begin_loading();
            snapshot.score.succeed(decoded, Utc::now());

            assert_eq!(level_for(&snapshot, None), Some(expected), "score {value}");
        }
    }

    #[test]
    fn test_current_trend() {
        assert_eq!(current_trend(&ProfileSnapshot::default()), None);
        assert_eq!(current_trend(&with_score(50.0, vec![])), Some(RiskTrend::Stable));
    }

    #[test]
    fn test_is_stale() {
        let updated = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let snapshot = with_score(50.0, vec![]);
        let max_age = Duration::from_secs(300);

        assert!(is_stale(&ProfileSnapshot::default(), max_age, updated));
        assert!(!is_stale(&snapshot, max_age, updated + chrono::Duration::seconds(300)));
        assert!(is_stale(&snapshot, max_age, updated + chrono::Duration::seconds(301)));
        assert!(!is_stale(&snapshot, max_age, updated - chrono::Duration::seconds(10)));
    }

    // =========================================================================
    // Loading and history
    // =========================================================================

    #[test]
    fn test_is_loading_any_slot() {
        let mut snapshot = ProfileSnapshot::default();
        assert!(!is_loading(&snapshot));
        snapshot.mitigations.begin_loading();
        assert!(is_loading(&snapshot));
    }

    #[test]
    fn test_history_series_and_average() {
        let mut snapshot = ProfileSnapshot::default();
        assert!(history_series(&snapshot).is_empty());
        assert_eq!(average_history_value(&snapshot), None);

        let day = |d| Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap();
        let points = vec![
            RiskHistoryPoint { observed_at: day(1), value: 40.0 },
            RiskHistoryPoint { observed_at: day(2), value: 60.0 },
        ];
        snapshot.history = ResourceSlot::default();
        snapshot.history.begin_loading();
        snapshot.history.succeed(points, day(3));

        assert_eq!(history_series(&snapshot), vec![(day(1), 40.0), (day(2), 60.0)]);
        assert_eq!(average_history_value(&snapshot), Some(50.0));
    }
}
