//! Prediction CLI commands

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;

use crate::client::{ApiClient, Classification, DualPrediction, Reading, Regression};
use crate::output::{
    color_confidence, color_status, color_verdict, format_minutes, format_probability,
    print_json, print_warning, OutputFormat,
};

/// Which predictions to request
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum PredictMode {
    #[default]
    Both,
    Classification,
    Regression,
}

/// Predict from an explicit batch of readings
pub async fn predict(
    client: &ApiClient,
    readings: &[Reading],
    mode: PredictMode,
    format: OutputFormat,
) -> Result<()> {
    if readings.is_empty() {
        print_warning("No readings to send");
        return Ok(());
    }

    match mode {
        PredictMode::Both => {
            let prediction = client.predict_both(readings).await?;
            show_dual(&prediction, format)
        }
        PredictMode::Classification => {
            let classification = client.predict_classification(readings).await?;
            match format {
                OutputFormat::Json => print_json(&classification),
                OutputFormat::Table => {
                    print_header(readings.len(), None);
                    print_classification(&classification);
                    Ok(())
                }
            }
        }
        PredictMode::Regression => {
            let regression = client.predict_regression(readings).await?;
            match format {
                OutputFormat::Json => print_json(&regression),
                OutputFormat::Table => {
                    print_header(readings.len(), None);
                    print_regression(&regression);
                    Ok(())
                }
            }
        }
    }
}

/// Predict from the daemon's live reading window
pub async fn live(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let prediction = client.predict_live().await?;
    show_dual(&prediction, format)
}

fn show_dual(prediction: &DualPrediction, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(prediction),
        OutputFormat::Table => {
            print_header(prediction.readings_used, Some(&prediction.timestamp));
            print_classification(&prediction.classification);
            println!();
            print_regression(&prediction.regression);
            Ok(())
        }
    }
}

fn print_header(readings_used: usize, timestamp: Option<&str>) {
    println!("{}", "Bearing Failure Prediction".bold());
    println!("{}", "=".repeat(50));
    println!("Readings used:          {}", readings_used);
    if let Some(ts) = timestamp {
        println!("Generated:              {}", format_timestamp(ts));
    }
    println!();
}

fn print_classification(c: &Classification) {
    println!("{}", "Classification".bold());
    println!("{}", "-".repeat(50));
    println!("Verdict:                {}", color_verdict(c.will_fail_soon));
    println!(
        "Failure probability:    {}",
        format_probability(c.failure_probability)
    );
    println!("Confidence:             {}", color_confidence(&c.confidence));
    println!("Horizon:                {} min", c.threshold_minutes);
}

fn print_regression(r: &Regression) {
    println!("{}", "Time to Failure".bold());
    println!("{}", "-".repeat(50));
    println!(
        "Estimate:               {}",
        format_minutes(r.minutes_to_failure)
    );
    println!("Hours:                  {:.2}", r.hours_to_failure);
    println!("Status:                 {}", color_status(&r.status));
}

fn format_timestamp(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string())
}
