use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{DashboardConfig, RulesConfig, SourceKind};
use pipeline::DashboardPipeline;
use serde::Serialize;
use serde_json::json;
use std::env;
use std::path::PathBuf;
use tracing::info;

mod config;
mod fetcher;
mod models;
mod pipeline;
mod processor;
mod storage;

const DEFAULT_CONFIG_PATH: &str = "configs/dashboard.toml";

/// Simulated campaign analytics over retail order exports.
#[derive(Debug, Parser)]
#[command(name = "campaign-insights", version)]
struct Cli {
    /// Dashboard config file (falls back to $DASHBOARD_CONFIG, then configs/dashboard.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Which CSV layout to read
    #[arg(long, global = true, value_enum, default_value_t = SourceKind::Orders)]
    source: SourceKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Whole-dataset simulated KPIs
    Metrics {
        #[arg(long)]
        window: Option<i64>,
    },
    /// Cost per conversion and conversion rate per campaign
    Scatter {
        #[arg(long)]
        window: Option<i64>,
    },
    /// Revenue per region and category
    Pivot {
        #[arg(long)]
        window: Option<i64>,
    },
    /// Budget and bid recommendations
    Recommendations {
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
    /// Mark recommendations as applied
    Apply {
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
    },
    /// Write the metrics and recommendation sheets
    Export,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| env::var("DASHBOARD_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = DashboardConfig::load_or_default(&config_path)
        .context("Failed to load dashboard configuration")?;
    let rules = RulesConfig::load_or_default(&config.rules.path);

    info!("🚀 Starting campaign insights ({:?} source)", cli.source);

    let pipeline = DashboardPipeline::new(config, rules);

    match cli.command {
        Command::Metrics { window } => {
            print_json(&pipeline.metrics(cli.source, window)?)?;
        }
        Command::Scatter { window } => {
            let points = pipeline.scatter(cli.source, window)?;
            print_json(&json!({ "points": points, "simulated": true }))?;
        }
        Command::Pivot { window } => {
            let rows = pipeline.pivot(cli.source, window)?;
            print_json(&json!({ "rows": rows, "simulated": true }))?;
        }
        Command::Recommendations { limit } => {
            let items = pipeline.recommendations(cli.source, limit)?;
            print_json(&json!({ "items": items }))?;
        }
        Command::Apply { ids } => {
            print_json(&pipeline.apply(ids))?;
        }
        Command::Export => {
            let manifest = pipeline.export(cli.source)?;
            info!("✅ Export written to {}", manifest.directory.display());
            print_json(&json!({
                "metrics": manifest.metrics_path,
                "recommendations": manifest.recommendations_path,
            }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{}", rendered);
    Ok(())
}
