mod analyzer;
mod collector;
mod config;
mod export;
mod graph;
mod pipeline;
mod record;
mod report;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const RAW_TABLE_FILE: &str = "trending_data.csv";

#[derive(Parser)]
#[command(
    name = "trendgraph",
    version,
    about = "Map trending videos into a relationship graph and report on it."
)]
struct Cli {
    /// Config file path (defaults to ~/.trendgraph/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect the trending window, save the raw table, then analyze and report
    Collect {
        /// Collection window in days (overrides config)
        #[arg(long, value_parser = clap::value_parser!(u32).range(..=collector::MAX_WINDOW_DAYS as i64))]
        days: Option<u32>,
    },
    /// Analyze a previously saved raw table
    Analyze {
        /// Raw CSV table (defaults to <data_dir>/trending_data.csv)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Generate default config at ~/.trendgraph/config.toml
    Init,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    // Handle init before loading config (it creates the config file).
    if matches!(cli.command, Commands::Init) {
        let path = match &cli.config {
            Some(p) => {
                config::Config::write_default_to(p)?;
                p.clone()
            }
            None => config::Config::write_default()?,
        };
        println!("Default config written to {}", path.display());
        return Ok(());
    }

    let cfg = match &cli.config {
        Some(p) => config::Config::load_from(p)?,
        None => config::Config::load()?,
    };
    let raw_path = Path::new(&cfg.data_dir).join(RAW_TABLE_FILE);
    let output_dir = PathBuf::from(&cfg.report.output_dir);

    match cli.command {
        Commands::Collect { days } => {
            let days = days.unwrap_or(cfg.collect.days);
            let client = collector::YouTubeClient::from_config(&cfg)?;
            info!(days, region = %cfg.collect.region_code, "collecting trending videos");
            let today = chrono::Local::now().date_naive();
            let collected = collector::collect_trending_videos(&client, days, today).await?;
            if collected.records.is_empty() {
                warn!("no trending data collected; reporting on an empty table");
            }

            record::save_table(&raw_path, &collected.records)
                .with_context(|| format!("saving raw data to {}", raw_path.display()))?;
            info!("raw data saved to {}", raw_path.display());

            let artifacts = pipeline::analyze_and_report(
                &collected.records,
                collected.failed_days(),
                &output_dir,
                cfg.report.graph_export,
            )?;
            println!("Report: {}", artifacts.report.display());
            if let Some(p) = artifacts.graph_export {
                println!("Graph:  {}", p.display());
            }
        }
        Commands::Analyze { input } => {
            let path = input.unwrap_or(raw_path);
            let records = record::load_table(&path)?;
            info!(rows = records.len(), "loaded {}", path.display());
            let artifacts = pipeline::analyze_and_report(
                &records,
                Vec::new(),
                &output_dir,
                cfg.report.graph_export,
            )?;
            println!("Report: {}", artifacts.report.display());
            if let Some(p) = artifacts.graph_export {
                println!("Graph:  {}", p.display());
            }
        }
        Commands::Init => unreachable!(),
    }
    Ok(())
}
