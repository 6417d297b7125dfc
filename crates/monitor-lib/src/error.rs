//! Error taxonomy for ingestion and prediction
//!
//! Framing never fails (an incomplete frame just waits for more bytes), and
//! decode errors stay on the ingestion path. Everything a prediction caller can
//! observe is a [`PredictionError`].

use std::fmt;
use thiserror::Error;

/// How many bytes of a rejected frame to keep for logging
const FRAME_PREVIEW_BYTES: usize = 64;

/// A candidate frame that is not a well-formed telemetry record
#[derive(Debug, Error)]
#[error("malformed frame ({source}): {preview}")]
pub struct DecodeError {
    #[source]
    pub source: serde_json::Error,
    pub preview: String,
}

impl DecodeError {
    pub fn new(source: serde_json::Error, frame: &[u8]) -> Self {
        let end = frame.len().min(FRAME_PREVIEW_BYTES);
        Self {
            source,
            preview: String::from_utf8_lossy(&frame[..end]).into_owned(),
        }
    }
}

/// Which decision artifact an operation needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Classifier,
    Regressor,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Classifier => "classification",
            ArtifactKind::Regressor => "regression",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures surfaced to prediction callers
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Empty or malformed request batch
    #[error("invalid request: {0}")]
    Validation(String),

    /// The decision artifact needed for this call is not loaded
    #[error("{0} model not loaded")]
    ArtifactUnavailable(ArtifactKind),

    /// Feature vector does not match what the artifact was built against
    #[error(
        "feature shape mismatch: artifact expects {expected} features, got {actual} \
         (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    ShapeMismatch {
        expected: usize,
        actual: usize,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// The artifact itself failed or produced an unusable value
    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),
}

/// Failures while loading a decision artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artifact manifest {path}: {source}")]
    Manifest {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Checksum {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("invalid artifact {path}: {reason}")]
    Invalid { path: String, reason: String },

    #[error("failed to compile model {path}: {source}")]
    Model {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}
