//! Bearing monitor library
//!
//! This crate provides the core functionality for:
//! - Framing and decoding motor telemetry from a raw byte stream
//! - The bounded reading window shared between ingestion and serving
//! - Feature engineering and bearing failure prediction
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod predictor;

pub use error::{ArtifactError, ArtifactKind, DecodeError, PredictionError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ModelAvailability,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
