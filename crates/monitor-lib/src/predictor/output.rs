//! Prediction output formatting and post-processing
//!
//! Turns raw artifact outputs into the caller-facing classification and
//! regression results: tiering, clamping and rounding.

use crate::models::{Classification, Confidence, FailureStatus, Regression};

/// Failure horizon the classifier was trained for, in minutes
pub const FAILURE_THRESHOLD_MINUTES: u32 = 300;

/// Minutes-to-failure below which a bearing is critical
pub const CRITICAL_MINUTES: f64 = 60.0;

/// Minutes-to-failure below which a bearing needs attention
pub const WARNING_MINUTES: f64 = 300.0;

impl Confidence {
    /// Tier a failure probability; High is checked before Medium
    pub fn from_probability(p: f64) -> Self {
        if p > 0.8 || p < 0.2 {
            Confidence::High
        } else if p > 0.6 || p < 0.4 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl FailureStatus {
    pub fn from_minutes(minutes: f64) -> Self {
        if minutes < CRITICAL_MINUTES {
            FailureStatus::Critical
        } else if minutes < WARNING_MINUTES {
            FailureStatus::Warning
        } else {
            FailureStatus::Normal
        }
    }
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Reported alongside every classification
    pub threshold_minutes: u32,
    /// Decimal places kept for probabilities
    pub probability_decimals: i32,
    /// Decimal places kept for minutes and hours
    pub duration_decimals: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            threshold_minutes: FAILURE_THRESHOLD_MINUTES,
            probability_decimals: 4,
            duration_decimals: 2,
        }
    }
}

/// Formats raw artifact outputs into prediction results
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Tiers come from the unrounded probability
    pub fn classification(&self, is_failing: bool, probability: f64) -> Classification {
        let probability = probability.clamp(0.0, 1.0);
        Classification {
            will_fail_soon: is_failing,
            failure_probability: round_to(probability, self.config.probability_decimals),
            confidence: Confidence::from_probability(probability),
            threshold_minutes: self.config.threshold_minutes,
        }
    }

    /// Negative estimates are clamped to zero before tiering
    pub fn regression(&self, minutes: f64) -> Regression {
        let minutes = minutes.max(0.0);
        Regression {
            minutes_to_failure: round_to(minutes, self.config.duration_decimals),
            hours_to_failure: round_to(minutes / 60.0, self.config.duration_decimals),
            status: FailureStatus::from_minutes(minutes),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
