//! Time-series feature engineering
//!
//! Expands base channels into the feature set the decision artifacts were
//! trained on: rolling statistics, lags, rates of change and pairwise
//! interactions. One feature vector is produced per timestep; early
//! timesteps use shrunken windows instead of being undefined.

use super::bearing::BEARING_CHANNELS;
use crate::error::PredictionError;
use crate::models::FeatureVector;
use std::sync::Arc;

/// Rolling window sizes used during training
pub const DEFAULT_ROLLING_WINDOWS: [usize; 3] = [3, 5, 10];

/// Lag periods used during training
pub const DEFAULT_LAG_PERIODS: [usize; 3] = [1, 2, 3];

/// Feature engineering configuration
///
/// Must match the configuration the decision artifacts were built with,
/// otherwise prediction fails with a shape mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    pub base_channels: Vec<String>,
    pub rolling_windows: Vec<usize>,
    pub lag_periods: Vec<usize>,
    pub create_interactions: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            base_channels: BEARING_CHANNELS.iter().map(|c| c.to_string()).collect(),
            rolling_windows: DEFAULT_ROLLING_WINDOWS.to_vec(),
            lag_periods: DEFAULT_LAG_PERIODS.to_vec(),
            create_interactions: true,
        }
    }
}

/// Ordered per-timestep values of one or more named channels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesFrame {
    columns: Vec<(String, Vec<f64>)>,
}

impl SeriesFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column; every column must have the same number of timesteps
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, PredictionError> {
        let name = name.into();
        if let Some((_, first)) = self.columns.first() {
            if first.len() != values.len() {
                return Err(PredictionError::Validation(format!(
                    "column {} has {} timesteps, expected {}",
                    name,
                    values.len(),
                    first.len()
                )));
            }
        }
        self.columns.retain(|(existing, _)| *existing != name);
        self.columns.push((name, values));
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Number of timesteps
    pub fn len(&self) -> usize {
        self.columns.first().map(|(_, v)| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Derives feature vectors from base-channel series
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    config: FeatureConfig,
    names: Arc<[String]>,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        let names = feature_names(&config).into();
        Self { config, names }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Output feature names, in vector order
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// One feature vector per timestep of `frame`
    pub fn transform(&self, frame: &SeriesFrame) -> Result<Vec<FeatureVector>, PredictionError> {
        let series = self
            .config
            .base_channels
            .iter()
            .map(|channel| {
                frame.column(channel).ok_or_else(|| {
                    PredictionError::Validation(format!("missing base channel {}", channel))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let timesteps = frame.len();
        let mut rows: Vec<Vec<f64>> = (0..timesteps)
            .map(|_| Vec::with_capacity(self.names.len()))
            .collect();

        // Same column order as `feature_names`
        for values in &series {
            for (t, row) in rows.iter_mut().enumerate() {
                row.push(values[t]);
            }
        }
        for values in &series {
            for &window in &self.config.rolling_windows {
                for (t, row) in rows.iter_mut().enumerate() {
                    let stats = RollingStats::trailing(values, t, window);
                    row.extend([stats.mean, stats.std_dev, stats.min, stats.max]);
                }
            }
        }
        for values in &series {
            for &lag in &self.config.lag_periods {
                for (t, row) in rows.iter_mut().enumerate() {
                    row.push(lagged(values, t, lag));
                }
            }
        }
        for values in &series {
            for (t, row) in rows.iter_mut().enumerate() {
                row.push(difference(values, t));
                row.push(relative_change(values, t));
            }
        }
        if self.interactions_enabled() {
            for (i, left) in series.iter().enumerate() {
                for right in &series[i + 1..] {
                    for (t, row) in rows.iter_mut().enumerate() {
                        row.push(left[t] * right[t]);
                    }
                }
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let values = row.into_iter().map(finite_or_zero).collect();
                FeatureVector::new(self.names.clone(), values)
            })
            .collect())
    }

    /// Feature vector of the most recent timestep
    pub fn transform_latest(&self, frame: &SeriesFrame) -> Result<FeatureVector, PredictionError> {
        self.transform(frame)?
            .pop()
            .ok_or_else(|| PredictionError::Validation("no timesteps to featurize".to_string()))
    }

    fn interactions_enabled(&self) -> bool {
        self.config.create_interactions && self.config.base_channels.len() > 1
    }
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

/// Deterministic feature name list for a configuration
pub fn feature_names(config: &FeatureConfig) -> Vec<String> {
    let channels = &config.base_channels;
    let mut names: Vec<String> = channels.clone();

    for ch in channels {
        for w in &config.rolling_windows {
            names.push(format!("{}_rolling_mean_{}", ch, w));
            names.push(format!("{}_rolling_std_{}", ch, w));
            names.push(format!("{}_rolling_min_{}", ch, w));
            names.push(format!("{}_rolling_max_{}", ch, w));
        }
    }
    for ch in channels {
        for k in &config.lag_periods {
            names.push(format!("{}_lag_{}", ch, k));
        }
    }
    for ch in channels {
        names.push(format!("{}_diff", ch));
        names.push(format!("{}_pct_change", ch));
    }
    if config.create_interactions && channels.len() > 1 {
        for (i, left) in channels.iter().enumerate() {
            for right in &channels[i + 1..] {
                names.push(format!("{}_x_{}", left, right));
            }
        }
    }

    names
}

/// Summary statistics over a slice of readings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl RollingStats {
    /// Statistics of `values`; all zero for an empty slice
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        Self {
            mean: mean(values),
            std_dev: population_std_dev(values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Statistics over the trailing `min(window, t + 1)` values ending at `t`
    pub fn trailing(values: &[f64], t: usize, window: usize) -> Self {
        let start = (t + 1).saturating_sub(window.max(1));
        Self::of(&values[start..=t])
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, zero for fewer than two values
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Value `lag` steps back, back-filled with the earliest value
fn lagged(values: &[f64], t: usize, lag: usize) -> f64 {
    if t >= lag {
        values[t - lag]
    } else {
        values[0]
    }
}

fn difference(values: &[f64], t: usize) -> f64 {
    if t == 0 {
        0.0
    } else {
        values[t] - values[t - 1]
    }
}

fn relative_change(values: &[f64], t: usize) -> f64 {
    if t == 0 || values[t - 1] == 0.0 {
        return 0.0;
    }
    finite_or_zero((values[t] - values[t - 1]) / values[t - 1])
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
