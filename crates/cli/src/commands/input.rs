//! Reading sources for `predict`

use crate::client::Reading;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Inline comma-separated values
pub fn from_values(values: &[f64]) -> Vec<Reading> {
    values
        .iter()
        .map(|v| Reading {
            value: *v,
            timestamp: None,
        })
        .collect()
}

/// Accepted JSON layouts for `--file`
#[derive(Deserialize)]
#[serde(untagged)]
enum ReadingsFile {
    Request { readings: Vec<FileReading> },
    List(Vec<FileReading>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FileReading {
    Plain(f64),
    Object {
        #[serde(alias = "vibration_rms")]
        value: f64,
        #[serde(default)]
        timestamp: Option<i64>,
    },
}

/// Readings from a JSON file: `[1.0, ...]`, `[{"value": 1.0}, ...]` or a full request body
pub fn from_json_file(path: &Path) -> Result<Vec<Reading>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: ReadingsFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a readings file", path.display()))?;

    let entries = match parsed {
        ReadingsFile::Request { readings } => readings,
        ReadingsFile::List(readings) => readings,
    };
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            FileReading::Plain(value) => Reading {
                value,
                timestamp: None,
            },
            FileReading::Object { value, timestamp } => Reading { value, timestamp },
        })
        .collect())
}

/// Trailing `last` values of `column` in a telemetry CSV; empty cells are skipped
pub fn from_csv(path: &Path, column: &str, last: Option<usize>) -> Result<Vec<Reading>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader.headers().context("Failed to read CSV header")?;
    let Some(idx) = headers.iter().position(|h| h == column) else {
        bail!("column {} not found in {}", column, path.display());
    };

    let mut values = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Bad CSV row {}", line + 2))?;
        let cell = record.get(idx).unwrap_or("").trim();
        if cell.is_empty() {
            continue;
        }
        let value: f64 = cell
            .parse()
            .with_context(|| format!("Row {}: {:?} is not a number", line + 2, cell))?;
        values.push(value);
    }

    if let Some(n) = last {
        let skip = values.len().saturating_sub(n);
        values.drain(..skip);
    }
    Ok(from_values(&values))
}
