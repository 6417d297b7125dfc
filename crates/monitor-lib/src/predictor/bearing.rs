//! Bearing base channels derived from raw vibration readings

use super::features::{RollingStats, SeriesFrame};
use crate::error::PredictionError;

pub const MEAN_BEARING: &str = "mean_bearing_1";
pub const STD_BEARING: &str = "std_bearing_1";
pub const MAX_BEARING: &str = "max_bearing_1";
pub const MIN_BEARING: &str = "min_bearing_1";

/// Base channels in feature order
pub const BEARING_CHANNELS: [&str; 4] = [MEAN_BEARING, STD_BEARING, MAX_BEARING, MIN_BEARING];

/// Summarize each timestep over the trailing `min(window, t + 1)` readings
pub fn bearing_frame(readings: &[f64], window: usize) -> Result<SeriesFrame, PredictionError> {
    let stats: Vec<RollingStats> = (0..readings.len())
        .map(|t| RollingStats::trailing(readings, t, window))
        .collect();

    SeriesFrame::new()
        .with_column(MEAN_BEARING, stats.iter().map(|s| s.mean).collect())?
        .with_column(STD_BEARING, stats.iter().map(|s| s.std_dev).collect())?
        .with_column(MAX_BEARING, stats.iter().map(|s| s.max).collect())?
        .with_column(MIN_BEARING, stats.iter().map(|s| s.min).collect())
}
