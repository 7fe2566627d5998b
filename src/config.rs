//! Client and orchestrator configuration.
//!
//! All sections deserialize from TOML with defaults for every field, so an
//! empty file (or no file) is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_HISTORY_WINDOW_DAYS, DEFAULT_TOP_DRIVERS};
use crate::logging::LogConfig;
use crate::BaseUrl;

/// HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Named environment ("production", "staging", "localhost") or a full URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout enforced by the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Environment variable holding the bearer token (unset = anonymous)
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_base_url() -> String {
    "production".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("supplier-risk-sdk/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_token_env() -> String {
    "RISK_API_TOKEN".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            token_env: default_token_env(),
        }
    }
}

impl ClientConfig {
    pub fn base_url(&self) -> BaseUrl {
        match self.base_url.parse() {
            Ok(url) => url,
            Err(never) => match never {},
        }
    }

    /// Token from the configured environment variable, if set and non-empty.
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

/// Orchestrator defaults used by `fetch_all` and the derived views.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// History window requested by `fetch_all`
    #[serde(default = "default_history_window_days")]
    pub history_window_days: u32,

    /// Drivers shown by default in summaries
    #[serde(default = "default_top_drivers")]
    pub top_drivers: usize,

    /// Age after which the score is considered stale
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

fn default_history_window_days() -> u32 {
    DEFAULT_HISTORY_WINDOW_DAYS
}

fn default_top_drivers() -> usize {
    DEFAULT_TOP_DRIVERS
}

fn default_stale_after_secs() -> u64 {
    300
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_window_days: default_history_window_days(),
            top_drivers: default_top_drivers(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

impl OrchestratorConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

impl AppConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that would make every request fail or every view empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.client.timeout_secs == 0 {
            return Err("client.timeout_secs must be > 0".to_string());
        }
        if self.client.base_url.trim().is_empty() {
            return Err("client.base_url must not be empty".to_string());
        }
        if self.orchestrator.history_window_days == 0 {
            return Err("orchestrator.history_window_days must be > 0".to_string());
        }
        if self.orchestrator.top_drivers == 0 {
            return Err("orchestrator.top_drivers must be > 0".to_string());
        }
        Ok(())
    }
}
