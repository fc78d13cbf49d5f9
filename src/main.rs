//! Chronicle Pipeline CLI
//!
//! Evaluates expressions over series loaded from a JSON file:
//! - `eval`: run an expression and print the resulting series as JSON
//! - `init-config`: print a default config file

use anyhow::Context;
use chronicle_pipeline::config::generate_default_config;
use chronicle_pipeline::{
    parse_time_spec, Config, ExpressionEvaluator, LoggingConfig, MemoryStore, QuerySplicer,
    Series, SeriesOutput, TimeRange,
};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chronicle-pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Downsample, splice and evaluate time-series expressions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate an expression
    Eval {
        /// JSON file with raw series: [{"metric", "tags", "dps": [{"timestamp", "value"}]}]
        #[arg(short, long)]
        data: PathBuf,
        /// Expression, e.g. "sumSeries(sum:cpu{host=*})" or a bare metric query
        #[arg(short, long)]
        expr: String,
        /// Window start: epoch ms, RFC 3339 or "<duration>-ago"
        #[arg(short, long, default_value = "1h-ago")]
        start: String,
        /// Window end (default: now)
        #[arg(long)]
        end: Option<String>,
        /// Print query stats to stderr when done
        #[arg(long)]
        stats: bool,
    },

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Eval {
            data,
            expr,
            start,
            end,
            stats,
        } => {
            let start = parse_time_spec(&start)?;
            let end = match end {
                Some(end) => parse_time_spec(&end)?,
                None => chrono::Utc::now().timestamp_millis(),
            };
            let range = TimeRange::try_new(start, end).context("start must be before end")?;

            let json = std::fs::read_to_string(&data)
                .with_context(|| format!("Failed to read {:?}", data))?;
            let store = MemoryStore::from_json(&json)?;
            tracing::info!("Loaded {} series from {:?}", store.len().await, data);

            let splicer = QuerySplicer::new(Arc::new(store), config.splicer.clone());
            let evaluator = ExpressionEvaluator::new(splicer);
            let series = evaluator.evaluate(&expr, range).await?;

            let output: Vec<SeriesOutput> = series.iter().map(Series::to_output).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);

            if stats {
                let mut collected = BTreeMap::new();
                evaluator.stats().collect_stats(&mut collected);
                for (name, value) in collected {
                    eprintln!("{} {}", name, value);
                }
            }
        }

        Commands::InitConfig { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    tracing::info!("Wrote default config to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chronicle_pipeline={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}
