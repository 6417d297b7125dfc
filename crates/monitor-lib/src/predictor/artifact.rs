//! Decision artifact loading
//!
//! An artifact is a JSON manifest naming the features it was trained on and
//! the model itself: either an ONNX graph run with tract, or inline linear
//! coefficients. Artifacts are loaded once at startup and read-only after.

use super::{Classifier, ClassifierOutput, Regressor};
use crate::error::ArtifactError;
use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tract_onnx::prelude::*;
use tracing::debug;

/// Decision threshold for classifiers that do not set one
const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Artifact manifest as stored next to the model
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactManifest {
    pub version: String,
    /// Feature names in model input order
    pub features: Vec<String>,
    /// Hex SHA256 of the ONNX file
    #[serde(default)]
    pub sha256: Option<String>,
    pub model: ModelSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ModelSpec {
    /// Path is resolved relative to the manifest
    Onnx { path: PathBuf },
    Linear {
        weights: Vec<f64>,
        intercept: f64,
        #[serde(default)]
        threshold: Option<f64>,
    },
}

impl ArtifactManifest {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let manifest: Self =
            serde_json::from_slice(&raw).map_err(|source| ArtifactError::Manifest {
                path: path.display().to_string(),
                source,
            })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<(), ArtifactError> {
        let invalid = |reason: String| ArtifactError::Invalid {
            path: path.display().to_string(),
            reason,
        };

        if self.features.is_empty() {
            return Err(invalid("no features listed".to_string()));
        }
        let unique: HashSet<&str> = self.features.iter().map(String::as_str).collect();
        if unique.len() != self.features.len() {
            return Err(invalid("duplicate feature names".to_string()));
        }
        if let ModelSpec::Linear {
            weights, threshold, ..
        } = &self.model
        {
            if weights.len() != self.features.len() {
                return Err(invalid(format!(
                    "{} weights for {} features",
                    weights.len(),
                    self.features.len()
                )));
            }
            if let Some(t) = threshold {
                if !(0.0..=1.0).contains(t) {
                    return Err(invalid(format!("threshold {} outside [0, 1]", t)));
                }
            }
        }
        Ok(())
    }

    /// Read, verify and compile the ONNX graph the manifest points at
    fn compile_onnx(&self, manifest_path: &Path, model_path: &Path) -> Result<OnnxModel, ArtifactError> {
        let resolved = match manifest_path.parent() {
            Some(dir) if model_path.is_relative() => dir.join(model_path),
            _ => model_path.to_path_buf(),
        };
        let display = resolved.display().to_string();

        let bytes = std::fs::read(&resolved).map_err(|source| ArtifactError::Io {
            path: display.clone(),
            source,
        })?;

        if let Some(expected) = &self.sha256 {
            let actual = compute_checksum(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ArtifactError::Checksum {
                    path: display,
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let plan = compile(&bytes, self.features.len()).map_err(|source| ArtifactError::Model {
            path: display,
            source,
        })?;
        Ok(OnnxModel {
            plan,
            num_features: self.features.len(),
        })
    }
}

/// SHA256 of the model bytes, hex encoded
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn compile(bytes: &[u8], num_features: usize) -> Result<TractModel> {
    let model = tract_onnx::onnx()
        .model_for_read(&mut std::io::Cursor::new(bytes))
        .context("Failed to parse ONNX model")?
        .with_input_fact(0, f32::fact([1, num_features]).into())
        .context("Failed to set input shape")?
        .into_optimized()
        .context("Failed to optimize model")?
        .into_runnable()
        .context("Failed to create runnable model")?;
    Ok(model)
}

/// Compiled ONNX graph taking one `[1, n]` f32 row
struct OnnxModel {
    plan: TractModel,
    num_features: usize,
}

impl OnnxModel {
    fn run(&self, values: &[f64]) -> Result<TVec<TValue>> {
        let data: Vec<f32> = values.iter().map(|v| *v as f32).collect();
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)?.into();
        let outputs = self.plan.run(tvec!(input.into()))?;
        Ok(outputs)
    }
}

fn first_f32(outputs: &[TValue]) -> Result<Vec<f32>> {
    let output = outputs
        .iter()
        .find(|o| o.datum_type() == f32::datum_type())
        .context("Model produced no f32 output")?;
    Ok(output.to_array_view::<f32>()?.iter().copied().collect())
}

/// ONNX classifier emitting class probabilities and optionally a label
pub struct OnnxClassifier {
    manifest: ArtifactManifest,
    model: OnnxModel,
}

impl Classifier for OnnxClassifier {
    fn feature_names(&self) -> &[String] {
        &self.manifest.features
    }

    fn version(&self) -> &str {
        &self.manifest.version
    }

    fn classify(&self, values: &[f64]) -> Result<ClassifierOutput> {
        let outputs = self.model.run(values)?;

        let probabilities = first_f32(&outputs)?;
        // [p0, p1] from a two-class head, or a single failure probability
        let probability = match probabilities.as_slice() {
            [_, p1, ..] => *p1 as f64,
            [p] => *p as f64,
            [] => anyhow::bail!("Model produced an empty probability output"),
        };

        let label = outputs
            .iter()
            .find(|o| o.datum_type() == i64::datum_type())
            .map(|o| o.to_array_view::<i64>().map(|v| v.iter().next().copied()))
            .transpose()?
            .flatten();

        Ok(ClassifierOutput {
            is_failing: match label {
                Some(label) => label != 0,
                None => probability >= DEFAULT_DECISION_THRESHOLD,
            },
            probability,
        })
    }
}

/// ONNX regressor whose first output value is minutes-to-failure
pub struct OnnxRegressor {
    manifest: ArtifactManifest,
    model: OnnxModel,
}

impl Regressor for OnnxRegressor {
    fn feature_names(&self) -> &[String] {
        &self.manifest.features
    }

    fn version(&self) -> &str {
        &self.manifest.version
    }

    fn estimate(&self, values: &[f64]) -> Result<f64> {
        let outputs = self.model.run(values)?;
        let first = first_f32(&outputs)?
            .first()
            .copied()
            .context("Model produced an empty output")?;
        Ok(first as f64)
    }
}

fn dot(weights: &[f64], values: &[f64], intercept: f64) -> f64 {
    weights
        .iter()
        .zip(values)
        .map(|(w, x)| w * x)
        .sum::<f64>()
        + intercept
}

/// Logistic regression over the manifest's features
pub struct LogisticClassifier {
    version: String,
    features: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
    threshold: f64,
}

impl LogisticClassifier {
    pub fn new(
        version: impl Into<String>,
        features: Vec<String>,
        weights: Vec<f64>,
        intercept: f64,
        threshold: f64,
    ) -> Self {
        Self {
            version: version.into(),
            features,
            weights,
            intercept,
            threshold,
        }
    }
}

impl Classifier for LogisticClassifier {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn classify(&self, values: &[f64]) -> Result<ClassifierOutput> {
        let z = dot(&self.weights, values, self.intercept);
        let probability = 1.0 / (1.0 + (-z).exp());
        Ok(ClassifierOutput {
            is_failing: probability >= self.threshold,
            probability,
        })
    }
}

/// Linear model over the manifest's features
pub struct LinearRegressor {
    version: String,
    features: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(
        version: impl Into<String>,
        features: Vec<String>,
        weights: Vec<f64>,
        intercept: f64,
    ) -> Self {
        Self {
            version: version.into(),
            features,
            weights,
            intercept,
        }
    }
}

impl Regressor for LinearRegressor {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn estimate(&self, values: &[f64]) -> Result<f64> {
        Ok(dot(&self.weights, values, self.intercept))
    }
}

/// Load a classifier from its manifest
pub fn load_classifier(path: &Path) -> Result<Arc<dyn Classifier>, ArtifactError> {
    let manifest = ArtifactManifest::load(path)?;
    debug!(path = %path.display(), version = %manifest.version, "Loading classifier");

    match manifest.model.clone() {
        ModelSpec::Onnx { path: model_path } => {
            let model = manifest.compile_onnx(path, &model_path)?;
            Ok(Arc::new(OnnxClassifier { manifest, model }))
        }
        ModelSpec::Linear {
            weights,
            intercept,
            threshold,
        } => Ok(Arc::new(LogisticClassifier::new(
            manifest.version,
            manifest.features,
            weights,
            intercept,
            threshold.unwrap_or(DEFAULT_DECISION_THRESHOLD),
        ))),
    }
}

/// Load a regressor from its manifest
pub fn load_regressor(path: &Path) -> Result<Arc<dyn Regressor>, ArtifactError> {
    let manifest = ArtifactManifest::load(path)?;
    debug!(path = %path.display(), version = %manifest.version, "Loading regressor");

    match manifest.model.clone() {
        ModelSpec::Onnx { path: model_path } => {
            let model = manifest.compile_onnx(path, &model_path)?;
            Ok(Arc::new(OnnxRegressor { manifest, model }))
        }
        ModelSpec::Linear {
            weights,
            intercept,
            threshold: _,
        } => Ok(Arc::new(LinearRegressor::new(
            manifest.version,
            manifest.features,
            weights,
            intercept,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"model bytes");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"model bytes"));
    }

    #[test]
    fn test_load_linear_classifier() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "classifier.json",
            br#"{
                "version": "clf-1",
                "features": ["a", "b"],
                "model": {"format": "linear", "weights": [1.0, -1.0], "intercept": 0.0}
            }"#,
        );

        let classifier = load_classifier(&path).unwrap();
        assert_eq!(classifier.version(), "clf-1");
        assert_eq!(classifier.feature_names(), ["a".to_string(), "b".to_string()]);

        let out = classifier.classify(&[2.0, 2.0]).unwrap();
        assert_eq!(out.probability, 0.5);
        assert!(out.is_failing);

        let out = classifier.classify(&[0.0, 5.0]).unwrap();
        assert!(out.probability < 0.01);
        assert!(!out.is_failing);
    }

    #[test]
    fn test_linear_classifier_threshold() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "classifier.json",
            br#"{
                "version": "clf-2",
                "features": ["a"],
                "model": {"format": "linear", "weights": [1.0], "intercept": 0.0, "threshold": 0.9}
            }"#,
        );
        let classifier = load_classifier(&path).unwrap();
        let out = classifier.classify(&[1.0]).unwrap();
        assert!(out.probability > 0.7);
        assert!(!out.is_failing);
    }

    #[test]
    fn test_load_linear_regressor() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "regressor.json",
            br#"{
                "version": "reg-1",
                "features": ["a", "b"],
                "model": {"format": "linear", "weights": [10.0, 2.0], "intercept": 5.0}
            }"#,
        );
        let regressor = load_regressor(&path).unwrap();
        assert_eq!(regressor.estimate(&[1.0, 3.0]).unwrap(), 21.0);
    }

    #[test]
    fn test_weight_count_must_match_features() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "regressor.json",
            br#"{
                "version": "reg-1",
                "features": ["a", "b"],
                "model": {"format": "linear", "weights": [1.0], "intercept": 0.0}
            }"#,
        );
        assert!(matches!(
            load_regressor(&path),
            Err(ArtifactError::Invalid { .. })
        ));
    }

    #[test]
    fn test_duplicate_features_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "classifier.json",
            br#"{
                "version": "clf-1",
                "features": ["a", "a"],
                "model": {"format": "linear", "weights": [1.0, 1.0], "intercept": 0.0}
            }"#,
        );
        assert!(matches!(
            load_classifier(&path),
            Err(ArtifactError::Invalid { .. })
        ));
    }

    #[test]
    fn test_missing_manifest_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = load_classifier(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ArtifactError::Io { .. })));
    }

    #[test]
    fn test_malformed_manifest() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "classifier.json", br#"{"version": "x"}"#);
        assert!(matches!(
            load_classifier(&path),
            Err(ArtifactError::Manifest { .. })
        ));
    }

    #[test]
    fn test_onnx_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        write(&dir, "model.onnx", b"not really onnx");
        let path = write(
            &dir,
            "classifier.json",
            br#"{
                "version": "clf-onnx",
                "features": ["a"],
                "sha256": "0000000000000000000000000000000000000000000000000000000000000000",
                "model": {"format": "onnx", "path": "model.onnx"}
            }"#,
        );
        assert!(matches!(
            load_classifier(&path),
            Err(ArtifactError::Checksum { .. })
        ));
    }

    #[test]
    fn test_onnx_garbage_fails_to_compile() {
        let dir = TempDir::new().unwrap();
        let bytes = b"not really onnx";
        write(&dir, "model.onnx", bytes);
        let manifest = format!(
            r#"{{
                "version": "reg-onnx",
                "features": ["a"],
                "sha256": "{}",
                "model": {{"format": "onnx", "path": "model.onnx"}}
            }}"#,
            compute_checksum(bytes)
        );
        let path = write(&dir, "regressor.json", manifest.as_bytes());
        assert!(matches!(
            load_regressor(&path),
            Err(ArtifactError::Model { .. })
        ));
    }
}
