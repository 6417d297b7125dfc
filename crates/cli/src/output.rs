//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Pretty-print any response as JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format probability as percentage
pub fn format_probability(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Format minutes, switching to hours past two hours
pub fn format_minutes(minutes: f64) -> String {
    if minutes >= 120.0 {
        format!("{:.1} h", minutes / 60.0)
    } else {
        format!("{:.0} min", minutes)
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "normal" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        "unhealthy" | "critical" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a confidence tier label
pub fn color_confidence(confidence: &str) -> String {
    match confidence {
        "High" => confidence.green().to_string(),
        "Medium" => confidence.yellow().to_string(),
        _ => confidence.red().to_string(),
    }
}

/// Verdict line for a classification
pub fn color_verdict(will_fail_soon: bool) -> String {
    if will_fail_soon {
        "FAILURE EXPECTED".red().bold().to_string()
    } else {
        "no failure expected".green().to_string()
    }
}
