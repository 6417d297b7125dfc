//! Monitor configuration

use anyhow::{bail, Context, Result};
use monitor_lib::ingest::{FramingMode, DEFAULT_MAX_FRAME_BYTES, DEFAULT_WINDOW_CAPACITY};
use monitor_lib::DEFAULT_CHANNEL;
use serde::Deserialize;
use std::path::PathBuf;

/// Config file looked up when `MONITOR_CONFIG` is unset (any supported extension)
const DEFAULT_CONFIG_FILE: &str = "monitor";

/// Monitor configuration
///
/// Layered from an optional config file and `MONITOR_*` environment variables,
/// the latter taking precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Identifies this motor in logs
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Port for the prediction, health and metrics API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// `stdin`, `tcp://host:port` or a file path
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    #[serde(default)]
    pub framing: FramingMode,

    /// Unterminated frames longer than this are discarded
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Telemetry field that feeds the reading window
    #[serde(default = "default_channel")]
    pub channel: String,

    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Telemetry CSV the records are appended to
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    #[serde(default = "default_classifier_manifest")]
    pub classifier_manifest: PathBuf,

    #[serde(default = "default_regressor_manifest")]
    pub regressor_manifest: PathBuf,
}

fn default_device_id() -> String {
    "motor-1".to_string()
}

fn default_api_port() -> u16 {
    8001
}

fn default_source() -> String {
    "stdin".to_string()
}

fn default_read_chunk_size() -> usize {
    1024
}

fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("data_motor_training.csv")
}

fn default_classifier_manifest() -> PathBuf {
    PathBuf::from("models/classifier.json")
}

fn default_regressor_manifest() -> PathBuf {
    PathBuf::from("models/regressor.json")
}

/// Where telemetry bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteSource {
    Stdin,
    Tcp(String),
    File(PathBuf),
}

impl ByteSource {
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        if source.is_empty() || source == "stdin" || source == "-" {
            return Ok(ByteSource::Stdin);
        }
        if let Some(addr) = source.strip_prefix("tcp://") {
            if addr.is_empty() {
                bail!("tcp source needs host:port");
            }
            return Ok(ByteSource::Tcp(addr.to_string()));
        }
        Ok(ByteSource::File(PathBuf::from(source)))
    }
}

impl MonitorConfig {
    /// Load from `MONITOR_CONFIG` (or `./monitor.*`) and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var("MONITOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::from_sources(&file, config::Environment::with_prefix("MONITOR"))
    }

    fn from_sources(file: &str, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(env)
            .build()
            .context("Failed to read monitor configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid monitor configuration")?;
        config.byte_source()?;
        Ok(config)
    }

    pub fn byte_source(&self) -> Result<ByteSource> {
        ByteSource::parse(&self.source)
    }
}
