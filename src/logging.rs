//! Structured logging setup.
//!
//! # Component Targets
//!
//! | Target | Description |
//! |--------|-------------|
//! | `supplier_risk_sdk::orchestrator` | Subject changes, slot transitions, coalescing |
//! | `supplier_risk_sdk::fetcher` | Risk API requests and rejected payloads |
//!
//! # Example Usage
//!
//! ```bash
//! # Debug only the orchestrator
//! RUST_LOG=warn,supplier_risk_sdk::orchestrator=debug cargo run --bin risk_profile -- show S1
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format with colors (default for development)
    #[default]
    Pretty,
    /// JSON format (best for log aggregation)
    Json,
    /// Compact single-line format
    Compact,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Base level or full filter directive (overridden by `RUST_LOG`)
    #[serde(default = "default_level")]
    pub level: String,

    /// Format for stdout logging
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for daily-rotated JSON log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            log_dir: None,
        }
    }
}

impl LogConfig {
    /// JSON to stdout plus rotated files in `log_dir`.
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            format: LogFormat::Json,
            log_dir: Some(log_dir),
            ..Default::default()
        }
    }
}

fn build_filter(config: &LogConfig, env_filter_override: Option<&str>) -> EnvFilter {
    if let Some(filter) = env_filter_override {
        return EnvFilter::new(filter);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},hyper=warn,reqwest=warn", config.level))
    })
}

/// Initialize the global subscriber.
///
/// Returns the `WorkerGuard`s of the file writers; keep them alive for the
/// lifetime of the program or buffered lines are lost.
pub fn init_logging(
    config: &LogConfig,
    env_filter_override: Option<&str>,
) -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut guards = Vec::new();
    let filter = build_filter(config, env_filter_override);

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "risk-profile.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);

        let file_layer = fmt::layer().with_writer(writer).with_ansi(false).json();
        let registry = tracing_subscriber::registry().with(filter).with(file_layer);

        match config.format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
            LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
            LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).try_init()?,
        }
        eprintln!("Logging to directory: {}", log_dir.display());
    } else {
        match config.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .finish()
                .try_init()?,
            LogFormat::Compact => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .finish()
                .try_init()?,
            LogFormat::Pretty => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .finish()
                .try_init()?,
        }
    }

    Ok(guards)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_log_config_production() {
        let config = LogConfig::production(PathBuf::from("/var/log/risk"));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/risk")));
    }

    #[test]
    fn test_log_format_serde() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");

        let parsed: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(parsed, LogFormat::Compact);
    }
}
