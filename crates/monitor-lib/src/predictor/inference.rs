//! Inference against the loaded decision artifacts
//!
//! Checks every feature vector against the names an artifact was built with
//! and reorders it into the artifact's input order before running it.

use super::{Classifier, ClassifierOutput, Regressor};
use crate::error::{ArtifactKind, PredictionError};
use crate::models::FeatureVector;
use crate::observability::MonitorMetrics;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

/// Runs the classifier and regressor artifacts, when loaded
#[derive(Default)]
pub struct Predictor {
    classifier: Option<Arc<dyn Classifier>>,
    regressor: Option<Arc<dyn Regressor>>,
    metrics: MonitorMetrics,
}

impl Predictor {
    pub fn new(
        classifier: Option<Arc<dyn Classifier>>,
        regressor: Option<Arc<dyn Regressor>>,
    ) -> Self {
        Self {
            classifier,
            regressor,
            metrics: MonitorMetrics::new(),
        }
    }

    /// A predictor with no artifacts refuses every call
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn has_regressor(&self) -> bool {
        self.regressor.is_some()
    }

    pub fn is_available(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Classifier => self.has_classifier(),
            ArtifactKind::Regressor => self.has_regressor(),
        }
    }

    /// Failure decision and probability in [0, 1]
    pub fn classify(&self, features: &FeatureVector) -> Result<ClassifierOutput, PredictionError> {
        let classifier = self
            .classifier
            .as_deref()
            .ok_or(PredictionError::ArtifactUnavailable(ArtifactKind::Classifier))?;
        let values = align(features, classifier.feature_names())?;

        let start = Instant::now();
        let output = classifier
            .classify(&values)
            .map_err(PredictionError::Inference)?;
        self.record_latency(start, ArtifactKind::Classifier);

        if !(0.0..=1.0).contains(&output.probability) {
            return Err(PredictionError::Inference(anyhow::anyhow!(
                "classifier returned probability {}",
                output.probability
            )));
        }
        Ok(output)
    }

    /// Minutes until failure, never negative
    pub fn estimate_time_to_failure(
        &self,
        features: &FeatureVector,
    ) -> Result<f64, PredictionError> {
        let regressor = self
            .regressor
            .as_deref()
            .ok_or(PredictionError::ArtifactUnavailable(ArtifactKind::Regressor))?;
        let values = align(features, regressor.feature_names())?;

        let start = Instant::now();
        let minutes = regressor
            .estimate(&values)
            .map_err(PredictionError::Inference)?;
        self.record_latency(start, ArtifactKind::Regressor);

        if !minutes.is_finite() {
            return Err(PredictionError::Inference(anyhow::anyhow!(
                "regressor returned {}",
                minutes
            )));
        }
        Ok(minutes.max(0.0))
    }

    fn record_latency(&self, start: Instant, kind: ArtifactKind) {
        let elapsed = start.elapsed();
        let slow = elapsed.as_millis() > MAX_INFERENCE_MS;
        self.metrics.record_inference(kind, slow);

        if slow {
            warn!(
                model = %kind,
                elapsed_ms = elapsed.as_millis() as u64,
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(model = %kind, elapsed_us = elapsed.as_micros() as u64, "Inference completed");
        }
    }
}

/// Reorder `features` into `expected` order; the name sets must be equal
fn align(features: &FeatureVector, expected: &[String]) -> Result<Vec<f64>, PredictionError> {
    let provided: HashMap<&str, f64> = features.iter().collect();
    let wanted: HashSet<&str> = expected.iter().map(String::as_str).collect();

    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !provided.contains_key(name.as_str()))
        .cloned()
        .collect();
    let unexpected: Vec<String> = features
        .names()
        .iter()
        .filter(|name| !wanted.contains(name.as_str()))
        .cloned()
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() || features.len() != expected.len() {
        return Err(PredictionError::ShapeMismatch {
            expected: expected.len(),
            actual: features.len(),
            missing,
            unexpected,
        });
    }

    Ok(expected
        .iter()
        .map(|name| provided[name.as_str()])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{LinearRegressor, LogisticClassifier};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn inferences(kind: &str) -> u64 {
        prometheus::gather()
            .iter()
            .find(|f| f.get_name() == "bearing_monitor_inferences_total")
            .and_then(|f| {
                f.get_metric().iter().find(|m| {
                    m.get_label()
                        .iter()
                        .any(|l| l.get_name() == "kind" && l.get_value() == kind)
                })
            })
            .map(|m| m.get_counter().get_value() as u64)
            .unwrap_or(0)
    }

    fn predictor() -> Predictor {
        let classifier = LogisticClassifier::new("c1", names(&["a", "b"]), vec![1.0, 0.0], 0.0, 0.5);
        let regressor = LinearRegressor::new("r1", names(&["a", "b"]), vec![0.0, 100.0], -50.0);
        Predictor::new(Some(Arc::new(classifier)), Some(Arc::new(regressor)))
    }

    #[test]
    fn test_reorders_into_artifact_order() {
        let p = predictor();
        let before = inferences("classification");
        // Classifier only weights "a"
        let features = FeatureVector::from_pairs([("b", -3.0), ("a", 4.0)]);
        let out = p.classify(&features).unwrap();
        assert!(out.is_failing);
        assert!(out.probability > 0.98);

        let minutes = p.estimate_time_to_failure(&features).unwrap();
        assert_eq!(minutes, 0.0);
        assert!(inferences("classification") > before);
    }

    #[test]
    fn test_shape_mismatch_lists_differences() {
        let p = predictor();
        let features = FeatureVector::from_pairs([("a", 1.0), ("c", 2.0)]);
        match p.classify(&features) {
            Err(PredictionError::ShapeMismatch {
                expected,
                actual,
                missing,
                unexpected,
            }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 2);
                assert_eq!(missing, vec!["b".to_string()]);
                assert_eq!(unexpected, vec!["c".to_string()]);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_feature_is_mismatch() {
        let p = predictor();
        let features = FeatureVector::from_pairs([("a", 1.0), ("b", 2.0), ("z", 0.0)]);
        assert!(matches!(
            p.estimate_time_to_failure(&features),
            Err(PredictionError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_artifacts_are_unavailable() {
        let p = Predictor::unavailable();
        let features = FeatureVector::from_pairs([("a", 1.0)]);
        assert!(matches!(
            p.classify(&features),
            Err(PredictionError::ArtifactUnavailable(ArtifactKind::Classifier))
        ));
        assert!(matches!(
            p.estimate_time_to_failure(&features),
            Err(PredictionError::ArtifactUnavailable(ArtifactKind::Regressor))
        ));
        assert!(!p.is_available(ArtifactKind::Classifier));
    }

    #[test]
    fn test_non_finite_estimate_is_inference_error() {
        let regressor = LinearRegressor::new("r", names(&["a"]), vec![f64::INFINITY], 0.0);
        let p = Predictor::new(None, Some(Arc::new(regressor)));
        let features = FeatureVector::from_pairs([("a", 0.0)]);
        // inf * 0 is NaN
        assert!(matches!(
            p.estimate_time_to_failure(&features),
            Err(PredictionError::Inference(_))
        ));
    }
}
