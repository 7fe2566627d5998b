pub const PRODUCTION_API_URL: &str = "https://api.supplier-compliance.io";
pub const STAGING_API_URL: &str = "https://staging-api.supplier-compliance.io";
pub const LOCAL_API_URL: &str = "http://localhost:8000";

/// Window used by `fetch_history` when the caller does not pass one.
pub const DEFAULT_HISTORY_WINDOW_DAYS: u32 = 180;

/// Number of drivers returned by `top_drivers` by default.
pub const DEFAULT_TOP_DRIVERS: usize = 5;

/// Upper bound of the canonical score scale (scores live in `[0, MAX_RISK_SCORE]`).
pub const MAX_RISK_SCORE: f64 = 100.0;

/// Scores strictly below this are `low`.
pub const LOW_RISK_UPPER_BOUND: f64 = 30.0;

/// Scores strictly below this (and not low) are `medium`; everything else is `high`.
pub const MEDIUM_RISK_UPPER_BOUND: f64 = 60.0;
