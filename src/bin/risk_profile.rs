//! Supplier risk profile inspector.
//!
//! Loads one supplier's risk profile through the orchestrator and prints a
//! summary:
//! - CLI arguments and TOML config file support
//! - Bearer token from the environment (or a `.env` file)
//! - Structured logging with tracing

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use supplier_risk_sdk::config::AppConfig;
use supplier_risk_sdk::derived;
use supplier_risk_sdk::logging::{init_logging, LogFormat};
use supplier_risk_sdk::{
    ProfileSnapshot, ResourceKind, RiskClient, RiskOrchestrator, SlotEvent, StaticToken,
    SubjectId,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser)]
#[command(name = "risk_profile")]
#[command(version, about = "Supplier risk profile inspector", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "risk_profile.toml")]
    config: String,

    /// Override backend (production, staging, localhost, or a full URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Override history window in days
    #[arg(long)]
    days: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and print the full risk profile of a supplier
    Show {
        /// Supplier identifier
        supplier: String,
    },
    /// Ask the backend to recompute the score, then print the profile
    Recalculate {
        /// Supplier identifier
        supplier: String,
    },
    /// Generate a sample config file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "risk_profile.toml")]
        output: String,
    },
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (before parsing CLI args)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (supplier, recalculate) = match &cli.command {
        Commands::GenerateConfig { output } => {
            generate_sample_config(output)?;
            return Ok(());
        }
        Commands::Show { supplier } => (supplier.as_str(), false),
        Commands::Recalculate { supplier } => (supplier.as_str(), true),
    };

    let config = load_config(&cli)?;
    let _guards = init_logging(&config.logging, None)?;

    let subject = SubjectId::parse(supplier).ok_or("Supplier id must not be blank")?;

    let mut client = RiskClient::from_config(&config.client)?;
    if let Some(token) = config.client.token_from_env() {
        client = client.with_token_source(Arc::new(StaticToken::new(token)));
    } else {
        debug!(token_env = %config.client.token_env, "No bearer token configured");
    }
    info!(base_url = %client.http_client.base_url, supplier = %subject, "Loading risk profile");

    let orchestrator = RiskOrchestrator::with_config(client, config.orchestrator.clone());
    orchestrator.subscribe(Arc::new(|event: &SlotEvent| {
        debug!(
            kind = %event.kind,
            status = ?event.slot.status(),
            generation = event.generation,
            "Slot transition"
        );
    }));

    orchestrator.set_subject(Some(subject));
    let snapshot = if recalculate {
        orchestrator.recalculate_all().await
    } else {
        orchestrator.fetch_all().await
    };

    print_profile(&snapshot, config.orchestrator.top_drivers, &orchestrator);
    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(Path::new(&cli.config))?;

    if let Some(base_url) = &cli.base_url {
        config.client.base_url = base_url.clone();
    }
    if let Some(days) = cli.days {
        config.orchestrator.history_window_days = days;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(format!("Unknown log format '{other}'. Use: pretty, json, compact").into())
            }
        };
    }

    config.validate()?;
    Ok(config)
}

fn generate_sample_config(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let sample = AppConfig::default();
    let content = toml::to_string_pretty(&sample)?;

    let with_comments = format!(
        r#"# Supplier Risk Profile Configuration
# See: cargo run --bin risk_profile -- --help

{content}
# Note: the bearer token is read from the variable named by client.token_env
# (RISK_API_TOKEN by default), never from this file.
"#
    );

    std::fs::write(path, with_comments)?;
    println!("Sample config written to: {}", path);
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_profile<F: supplier_risk_sdk::ResourceFetcher>(
    snapshot: &ProfileSnapshot,
    top_n: usize,
    orchestrator: &RiskOrchestrator<F>,
) {
    let subject = snapshot
        .subject
        .as_ref()
        .map(SubjectId::as_str)
        .unwrap_or("-");

    println!();
    println!("═══════════════════════════════════════════════════════════");
    println!("  Risk Profile for {}", subject);
    println!("═══════════════════════════════════════════════════════════");
    println!();

    match snapshot.score.data() {
        Some(score) => {
            let level = derived::level_for(snapshot, None)
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  Score:           {:.1} ({})", score.value, level);
            println!("  Trend:           {:?}", score.trend);
            println!("  vs. last period: {:+.1}", score.change_from_prior_period);
            println!("  Updated:         {}", score.updated_at.to_rfc3339());
            if orchestrator.is_stale(orchestrator.config().stale_after()) {
                println!("  (stale)");
            }
        }
        None => println!("  Score:           unavailable"),
    }

    let drivers = derived::top_drivers(snapshot, top_n);
    if !drivers.is_empty() {
        println!();
        println!("  Top drivers:");
        for d in &drivers {
            println!("    {:<28} weight {:.2}  impact {}", d.factor, d.weight, d.impact);
        }
    }

    if let Some(benchmark) = snapshot.benchmark.data() {
        println!();
        println!(
            "  Industry:        avg {:.1}, gap {:+.1}",
            benchmark.industry_average,
            benchmark.gap_to_industry()
        );
    }

    if let Some(average) = derived::average_history_value(snapshot) {
        let points = derived::history_series(snapshot).len();
        println!("  History:         {} points, avg {:.1}", points, average);
    }

    if let Some(mitigations) = snapshot.mitigations.data() {
        if !mitigations.is_empty() {
            println!();
            println!("  Mitigations:");
            for m in mitigations {
                println!("    [{}] {}: {}", m.priority, m.risk_factor, m.recommendation);
            }
        }
    }

    let failures: Vec<_> = ResourceKind::ALL
        .iter()
        .filter_map(|kind| snapshot.error(*kind).map(|e| (*kind, e)))
        .collect();
    if !failures.is_empty() {
        println!();
        println!("  Errors:");
        for (kind, error) in failures {
            println!("    {:<12} {} (recovery: {:?})", kind, error, error.recovery());
        }
    }
    println!();
}
