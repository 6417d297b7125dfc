//! Bearing failure prediction engine

mod artifact;
mod bearing;
mod features;
mod inference;
mod output;
mod service;

pub use artifact::{
    compute_checksum, load_classifier, load_regressor, ArtifactManifest, LinearRegressor,
    LogisticClassifier, ModelSpec, OnnxClassifier, OnnxRegressor,
};
pub use bearing::{
    bearing_frame, BEARING_CHANNELS, MAX_BEARING, MEAN_BEARING, MIN_BEARING, STD_BEARING,
};
pub use features::{
    feature_names, population_std_dev, FeatureConfig, FeatureEngineer, RollingStats,
    SeriesFrame, DEFAULT_LAG_PERIODS, DEFAULT_ROLLING_WINDOWS,
};
pub use inference::Predictor;
pub use output::{
    OutputConfig, OutputFormatter, CRITICAL_MINUTES, FAILURE_THRESHOLD_MINUTES, WARNING_MINUTES,
};
pub use service::{PredictionService, ServiceConfig};

use anyhow::Result;

/// Raw classifier decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOutput {
    pub is_failing: bool,
    /// Probability of failure within the horizon
    pub probability: f64,
}

/// A trained failure classifier
///
/// `values` are ordered as [`Classifier::feature_names`].
pub trait Classifier: Send + Sync {
    /// Feature names the artifact was built against, in input order
    fn feature_names(&self) -> &[String];

    fn version(&self) -> &str;

    fn classify(&self, values: &[f64]) -> Result<ClassifierOutput>;
}

/// A trained time-to-failure regressor
///
/// `values` are ordered as [`Regressor::feature_names`].
pub trait Regressor: Send + Sync {
    /// Feature names the artifact was built against, in input order
    fn feature_names(&self) -> &[String];

    fn version(&self) -> &str;

    /// Minutes until failure
    fn estimate(&self, values: &[f64]) -> Result<f64>;
}
