//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use monitor_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::MonitorMetrics,
    predictor::PredictionService,
    PredictionError, Reading,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: MonitorMetrics,
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: MonitorMetrics,
        service: Arc<PredictionService>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            service,
        }
    }
}

/// Body of the prediction endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Chronological, oldest first
    pub readings: Vec<Reading>,
}

/// Current contents of the reading window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowResponse {
    pub channel: String,
    pub capacity: usize,
    pub readings: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Prediction failure rendered as `{"detail": ...}`
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        let status = match &err {
            PredictionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictionError::ArtifactUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PredictionError::ShapeMismatch { .. } | PredictionError::Inference(_) => {
                warn!(error = %err, "Prediction failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: format!("invalid request: {}", rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn predict_classification(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<monitor_lib::Classification> {
    let Json(request) = body?;
    Ok(Json(state.service.classify(&request.readings)?))
}

async fn predict_regression(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<monitor_lib::Regression> {
    let Json(request) = body?;
    Ok(Json(state.service.estimate(&request.readings)?))
}

async fn predict_both(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<monitor_lib::DualPrediction> {
    let Json(request) = body?;
    Ok(Json(state.service.predict_both(&request.readings)?))
}

async fn predict_live(State(state): State<Arc<AppState>>) -> ApiResult<monitor_lib::DualPrediction> {
    Ok(Json(state.service.predict_live().await?))
}

async fn window(State(state): State<Arc<AppState>>) -> Json<WindowResponse> {
    let window = state.service.window();
    Json(WindowResponse {
        channel: window.channel().to_string(),
        capacity: window.capacity().await,
        readings: window.snapshot().await,
    })
}

/// Health check response - returns 200 unless a component is unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict/classification", post(predict_classification))
        .route("/predict/regression", post(predict_regression))
        .route("/predict/both", post(predict_both))
        .route("/predict/live", get(predict_live))
        .route("/window", get(window))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    Ok(())
}
