//! Telemetry persistence
//!
//! Decoded records are handed to a [`RecordSink`]. The CSV sink appends one
//! row per record under the fixed field list, which is also what the training
//! notebooks read.

use crate::models::{TelemetryRecord, TELEMETRY_FIELDS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::info;

/// Destination for decoded telemetry records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist one record
    async fn write(&self, record: &TelemetryRecord) -> Result<()>;

    /// Flush buffered rows to durable storage
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Appends records to a CSV file, one row per record
pub struct CsvSink {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl CsvSink {
    /// Open `path` for appending, writing the header if the file is new or empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let needs_header = file.metadata().map(|m| m.len() == 0).unwrap_or(true);

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer
                .write_record(TELEMETRY_FIELDS)
                .context("Failed to write CSV header")?;
            writer.flush().context("Failed to flush CSV header")?;
            info!(path = %path.display(), "Created telemetry CSV");
        }

        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for CsvSink {
    async fn write(&self, record: &TelemetryRecord) -> Result<()> {
        let row: Vec<String> = record
            .values()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_default())
            .collect();

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {}", e))?;
        writer.write_record(&row).context("Failed to write CSV row")?;
        // Flushed per row, matching the device logger
        writer.flush().context("Failed to flush CSV row")?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {}", e))?;
        writer.flush().context("Failed to flush CSV")?;
        Ok(())
    }
}

/// Keeps records in memory
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<TelemetryRecord>>,
    flushes: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Times the owner asked for a flush
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&self, record: &TelemetryRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {}", e))?
            .push(record.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
