//! Window and health CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use crate::client::ApiClient;
use crate::output::{color_status, print_info, print_json, OutputFormat};

/// Row for the reading window table
#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Value")]
    value: String,
}

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show the daemon's current reading window
pub async fn show_window(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let window = client.window().await?;

    match format {
        OutputFormat::Json => print_json(&window)?,
        OutputFormat::Table => {
            println!("{}", "Reading Window".bold());
            println!("{}", "=".repeat(50));
            println!("Channel:   {}", window.channel.cyan());
            println!("Filled:    {}/{}", window.readings.len(), window.capacity);
            println!();

            if window.readings.is_empty() {
                print_info("No readings received yet");
                return Ok(());
            }

            let rows: Vec<ReadingRow> = window
                .readings
                .iter()
                .enumerate()
                .map(|(index, v)| ReadingRow {
                    index: index + 1,
                    value: format!("{:.3}", v),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
    }

    Ok(())
}

/// Show daemon health and model availability
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Monitor Health".bold());
            println!("{}", "=".repeat(50));
            println!("Status:          {}", color_status(&health.status));
            println!(
                "Classification:  {}",
                availability(health.models.classification)
            );
            println!("Regression:      {}", availability(health.models.regression));
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    message: c.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
    }

    Ok(())
}

fn availability(loaded: bool) -> String {
    if loaded {
        "loaded".green().to_string()
    } else {
        "not loaded".red().to_string()
    }
}
