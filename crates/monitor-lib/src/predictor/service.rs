//! Prediction service
//!
//! Turns an ordered batch of vibration readings into a prediction: derive
//! the bearing base channels, engineer one feature vector per reading, then
//! run the artifacts on the vector of the most recent reading only.

use super::{bearing_frame, FeatureConfig, FeatureEngineer, OutputConfig, OutputFormatter, Predictor};
use crate::error::{ArtifactKind, PredictionError};
use crate::ingest::{SharedWindow, DEFAULT_WINDOW_CAPACITY};
use crate::models::{Classification, DualPrediction, FeatureVector, Reading, Regression};
use crate::observability::{MonitorMetrics, StructuredLogger};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Configuration for the prediction service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Trailing readings summarized into each bearing base-channel value
    pub bearing_window: usize,
    pub features: FeatureConfig,
    pub output: OutputConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bearing_window: DEFAULT_WINDOW_CAPACITY,
            features: FeatureConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Serves predictions from request batches or the live reading window
///
/// Holds no mutable state besides the shared window; the artifacts inside
/// the predictor are read-only after construction.
pub struct PredictionService {
    predictor: Arc<Predictor>,
    engineer: FeatureEngineer,
    formatter: OutputFormatter,
    bearing_window: usize,
    window: SharedWindow,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(
        predictor: Arc<Predictor>,
        config: ServiceConfig,
        window: SharedWindow,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            predictor,
            engineer: FeatureEngineer::new(config.features),
            formatter: OutputFormatter::with_config(config.output),
            bearing_window: config.bearing_window,
            window,
            metrics: MonitorMetrics::new(),
            logger,
        }
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn window(&self) -> &SharedWindow {
        &self.window
    }

    pub fn feature_names(&self) -> &[String] {
        self.engineer.feature_names()
    }

    /// Feature vector describing the most recent reading
    pub fn latest_features(&self, readings: &[Reading]) -> Result<FeatureVector, PredictionError> {
        let values = validate(readings)?;
        let frame = bearing_frame(&values, self.bearing_window)?;
        self.engineer.transform_latest(&frame)
    }

    pub fn classify(&self, readings: &[Reading]) -> Result<Classification, PredictionError> {
        let start = Instant::now();
        let result = self
            .prepare(readings, &[ArtifactKind::Classifier])
            .and_then(|features| self.run_classifier(&features));
        let result = self.observe(start, result);
        if let Ok(classification) = &result {
            self.logger
                .log_prediction(readings.len(), Some(classification), None);
        }
        result
    }

    pub fn estimate(&self, readings: &[Reading]) -> Result<Regression, PredictionError> {
        let start = Instant::now();
        let result = self
            .prepare(readings, &[ArtifactKind::Regressor])
            .and_then(|features| self.run_regressor(&features));
        let result = self.observe(start, result);
        if let Ok(regression) = &result {
            self.logger
                .log_prediction(readings.len(), None, Some(regression));
        }
        result
    }

    /// Both predictions from one feature vector; needs both artifacts
    pub fn predict_both(&self, readings: &[Reading]) -> Result<DualPrediction, PredictionError> {
        let start = Instant::now();
        let result = self
            .prepare(readings, &[ArtifactKind::Classifier, ArtifactKind::Regressor])
            .and_then(|features| {
                Ok(DualPrediction {
                    classification: self.run_classifier(&features)?,
                    regression: self.run_regressor(&features)?,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    readings_used: readings.len(),
                })
            });
        let result = self.observe(start, result);
        if let Ok(prediction) = &result {
            self.logger.log_prediction(
                prediction.readings_used,
                Some(&prediction.classification),
                Some(&prediction.regression),
            );
        }
        result
    }

    /// Predict from whatever the reading window currently holds
    pub async fn predict_live(&self) -> Result<DualPrediction, PredictionError> {
        let snapshot = self.window.snapshot().await;
        if snapshot.is_empty() {
            self.metrics.inc_prediction_errors();
            return Err(PredictionError::Validation(format!(
                "reading window for {} is empty",
                self.window.channel()
            )));
        }
        let readings: Vec<Reading> = snapshot.into_iter().map(Reading::from).collect();
        debug!(readings = readings.len(), "Predicting from live window");
        self.predict_both(&readings)
    }

    /// Validate the batch, then make sure the artifacts exist before
    /// computing any features
    fn prepare(
        &self,
        readings: &[Reading],
        needs: &[ArtifactKind],
    ) -> Result<FeatureVector, PredictionError> {
        validate(readings)?;
        if let Some(kind) = needs.iter().find(|k| !self.predictor.is_available(**k)) {
            return Err(PredictionError::ArtifactUnavailable(*kind));
        }
        self.latest_features(readings)
    }

    fn run_classifier(&self, features: &FeatureVector) -> Result<Classification, PredictionError> {
        let output = self.predictor.classify(features)?;
        Ok(self
            .formatter
            .classification(output.is_failing, output.probability))
    }

    fn run_regressor(&self, features: &FeatureVector) -> Result<Regression, PredictionError> {
        let minutes = self.predictor.estimate_time_to_failure(features)?;
        Ok(self.formatter.regression(minutes))
    }

    fn observe<T>(
        &self,
        start: Instant,
        result: Result<T, PredictionError>,
    ) -> Result<T, PredictionError> {
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => self.metrics.inc_predictions_served(),
            Err(e) => {
                self.metrics.inc_prediction_errors();
                debug!(error = %e, "Prediction refused");
            }
        }
        result
    }
}

/// Raw values of a non-empty batch of finite readings
fn validate(readings: &[Reading]) -> Result<Vec<f64>, PredictionError> {
    if readings.is_empty() {
        return Err(PredictionError::Validation(
            "at least one reading is required".to_string(),
        ));
    }
    if let Some(idx) = readings.iter().position(|r| !r.value.is_finite()) {
        return Err(PredictionError::Validation(format!(
            "reading {} is not a finite number",
            idx
        )));
    }
    Ok(readings.iter().map(|r| r.value).collect())
}
