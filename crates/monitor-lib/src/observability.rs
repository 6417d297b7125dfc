//! Observability infrastructure for the bearing monitor
//!
//! Provides:
//! - Prometheus metrics (framing, decoding, persistence, prediction latency, artifacts)
//! - Structured JSON logging with tracing

use crate::error::ArtifactKind;
use crate::ingest::IngestStats;
use crate::models::{Classification, Regression};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct MonitorMetricsInner {
    frames_extracted: IntCounter,
    decode_errors: IntCounter,
    records_persisted: IntCounter,
    sink_errors: IntCounter,
    window_readings: IntGauge,
    predictions_served: IntCounter,
    prediction_errors: IntCounter,
    prediction_latency_seconds: Histogram,
    inferences: IntCounterVec,
    slow_inferences: IntCounterVec,
    artifact_info: GaugeVec,
    artifact_versions: Mutex<HashMap<&'static str, String>>,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            frames_extracted: register_int_counter!(
                "bearing_monitor_frames_extracted_total",
                "Candidate frames cut from the telemetry byte stream"
            )
            .expect("Failed to register frames_extracted"),

            decode_errors: register_int_counter!(
                "bearing_monitor_decode_errors_total",
                "Candidate frames rejected as malformed"
            )
            .expect("Failed to register decode_errors"),

            records_persisted: register_int_counter!(
                "bearing_monitor_records_persisted_total",
                "Telemetry records written to the sink"
            )
            .expect("Failed to register records_persisted"),

            sink_errors: register_int_counter!(
                "bearing_monitor_sink_errors_total",
                "Telemetry records the sink failed to persist"
            )
            .expect("Failed to register sink_errors"),

            window_readings: register_int_gauge!(
                "bearing_monitor_window_readings",
                "Number of readings currently held in the reading window"
            )
            .expect("Failed to register window_readings"),

            predictions_served: register_int_counter!(
                "bearing_monitor_predictions_served_total",
                "Predictions returned to callers"
            )
            .expect("Failed to register predictions_served"),

            prediction_errors: register_int_counter!(
                "bearing_monitor_prediction_errors_total",
                "Prediction calls that failed"
            )
            .expect("Failed to register prediction_errors"),

            prediction_latency_seconds: register_histogram!(
                "bearing_monitor_prediction_latency_seconds",
                "Time spent on feature engineering and inference per request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            inferences: register_int_counter_vec!(
                "bearing_monitor_inferences_total",
                "Artifact invocations",
                &["kind"]
            )
            .expect("Failed to register inferences"),

            slow_inferences: register_int_counter_vec!(
                "bearing_monitor_slow_inferences_total",
                "Artifact invocations that exceeded the latency target",
                &["kind"]
            )
            .expect("Failed to register slow_inferences"),

            artifact_info: register_gauge_vec!(
                "bearing_monitor_artifact_info",
                "Information about the loaded decision artifacts",
                &["kind", "version"]
            )
            .expect("Failed to register artifact_info"),

            artifact_versions: Mutex::new(HashMap::new()),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn add_frames_extracted(&self, count: u64) {
        self.inner().frames_extracted.inc_by(count);
    }

    pub fn inc_decode_errors(&self) {
        self.inner().decode_errors.inc();
    }

    pub fn inc_records_persisted(&self) {
        self.inner().records_persisted.inc();
    }

    pub fn inc_sink_errors(&self) {
        self.inner().sink_errors.inc();
    }

    pub fn set_window_readings(&self, count: usize) {
        self.inner().window_readings.set(count as i64);
    }

    pub fn inc_predictions_served(&self) {
        self.inner().predictions_served.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .observe(duration_secs);
    }

    /// Count one artifact invocation, flagging it when over the latency target
    pub fn record_inference(&self, kind: ArtifactKind, slow: bool) {
        let inner = self.inner();
        inner.inferences.with_label_values(&[kind.as_str()]).inc();
        if slow {
            inner.slow_inferences.with_label_values(&[kind.as_str()]).inc();
        }
    }

    /// Record the version of a freshly loaded artifact
    pub fn set_artifact_version(&self, kind: ArtifactKind, version: &str) {
        let inner = self.inner();
        if let Ok(mut versions) = inner.artifact_versions.lock() {
            if let Some(previous) = versions.insert(kind.as_str(), version.to_string()) {
                if previous != version {
                    let _ = inner
                        .artifact_info
                        .remove_label_values(&[kind.as_str(), previous.as_str()]);
                }
            }
        }
        inner
            .artifact_info
            .with_label_values(&[kind.as_str(), version])
            .set(1.0);
    }
}

/// Structured logger for monitor events
///
/// Provides consistent JSON-formatted logging for predictions,
/// artifact loading, and stream health.
#[derive(Clone)]
pub struct StructuredLogger {
    device_id: String,
}

impl StructuredLogger {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Log monitor startup
    pub fn log_startup(&self, version: &str, source: &str) {
        info!(
            event = "monitor_started",
            device = %self.device_id,
            monitor_version = %version,
            source = %source,
            "Bearing monitor started"
        );
    }

    /// Log monitor shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            device = %self.device_id,
            reason = %reason,
            "Bearing monitor shutting down"
        );
    }

    /// Log the outcome of loading a decision artifact
    pub fn log_artifact_load(&self, kind: ArtifactKind, path: &str, outcome: Result<&str, &str>) {
        match outcome {
            Ok(version) => info!(
                event = "artifact_loaded",
                device = %self.device_id,
                kind = %kind,
                path = %path,
                version = %version,
                "Decision artifact loaded"
            ),
            Err(error) => warn!(
                event = "artifact_load_failed",
                device = %self.device_id,
                kind = %kind,
                path = %path,
                error = %error,
                "Decision artifact unavailable, predictions of this kind will be refused"
            ),
        }
    }

    /// Log a rejected frame
    pub fn log_frame_rejected(&self, error: &str, preview: &str) {
        warn!(
            event = "frame_rejected",
            device = %self.device_id,
            error = %error,
            frame = %preview,
            "Malformed telemetry frame skipped"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(
        &self,
        readings_used: usize,
        classification: Option<&Classification>,
        regression: Option<&Regression>,
    ) {
        info!(
            event = "prediction_generated",
            device = %self.device_id,
            readings_used = readings_used,
            will_fail_soon = ?classification.map(|c| c.will_fail_soon),
            failure_probability = ?classification.map(|c| c.failure_probability),
            confidence = ?classification.map(|c| c.confidence),
            minutes_to_failure = ?regression.map(|r| r.minutes_to_failure),
            status = ?regression.map(|r| r.status),
            "Generated bearing failure prediction"
        );
    }

    /// Log the end of an ingestion run
    pub fn log_ingest_finished(&self, stats: &IngestStats, reason: &str) {
        info!(
            event = "ingest_finished",
            device = %self.device_id,
            bytes_read = stats.bytes_read,
            frames = stats.frames,
            decoded = stats.decoded,
            rejected = stats.rejected,
            missing_channel = stats.missing_channel,
            sink_errors = stats.sink_errors,
            bytes_skipped = stats.bytes_skipped,
            frame_overflows = stats.frame_overflows,
            reason = %reason,
            "Telemetry ingestion stopped"
        );
    }
}
