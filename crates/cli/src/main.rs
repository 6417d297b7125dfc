//! Bearing Monitor CLI
//!
//! A command-line tool for requesting bearing failure predictions and
//! inspecting the monitor daemon.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use commands::{input, predict, status};
use std::path::PathBuf;

/// Bearing Monitor CLI
#[derive(Parser)]
#[command(name = "bearingctl")]
#[command(author, version, about = "CLI for the Bearing Failure Monitor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via BEARINGCTL_API_URL env var)
    #[arg(long, env = "BEARINGCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict bearing failure from a batch of vibration readings
    #[command(group(ArgGroup::new("input").required(true).args(["values", "file", "csv"])))]
    Predict {
        /// Comma-separated readings, oldest first
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        values: Option<Vec<f64>>,

        /// JSON file with readings
        #[arg(long)]
        file: Option<PathBuf>,

        /// Telemetry CSV written by the monitor
        #[arg(long)]
        csv: Option<PathBuf>,

        /// CSV column holding the readings
        #[arg(long, requires = "csv")]
        column: Option<String>,

        /// Only send the last N readings from the CSV
        #[arg(long, requires = "csv")]
        last: Option<usize>,

        /// Which prediction to request
        #[arg(long, default_value = "both")]
        mode: predict::PredictMode,
    },

    /// Predict from the monitor's live reading window
    Live,

    /// Show the monitor's current reading window
    Window,

    /// Show monitor health and loaded models
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let client = client::ApiClient::new(&config.api_url(cli.api_url.as_deref()))?;

    match cli.command {
        Commands::Predict {
            values,
            file,
            csv,
            column,
            last,
            mode,
        } => {
            let readings = if let Some(values) = values {
                input::from_values(&values)
            } else if let Some(path) = file {
                input::from_json_file(&path)?
            } else {
                let path = csv.context("one of --values, --file or --csv is required")?;
                let column = column
                    .or(config.default_column)
                    .unwrap_or_else(|| "vibration_rms_mm_s".to_string());
                input::from_csv(&path, &column, last)?
            };
            predict::predict(&client, &readings, mode, cli.format).await?;
        }
        Commands::Live => predict::live(&client, cli.format).await?,
        Commands::Window => status::show_window(&client, cli.format).await?,
        Commands::Health => status::show_health(&client, cli.format).await?,
    }

    Ok(())
}
