//! Integration tests for the monitor API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bearing_monitor::api::{create_router, AppState};
use monitor_lib::{
    health::{components, HealthRegistry},
    ingest::SharedWindow,
    observability::{MonitorMetrics, StructuredLogger},
    predictor::{
        FeatureEngineer, LinearRegressor, LogisticClassifier, PredictionService, Predictor,
        ServiceConfig, MAX_BEARING,
    },
    ArtifactKind,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Weights that only look at the bearing maximum
fn weights_on_max(weight: f64) -> (Vec<String>, Vec<f64>) {
    let names = FeatureEngineer::default().feature_names().to_vec();
    let weights = names
        .iter()
        .map(|n| if n == MAX_BEARING { weight } else { 0.0 })
        .collect();
    (names, weights)
}

fn predictor(with_regressor: bool) -> Predictor {
    // Fails once the bearing maximum passes 4
    let (names, weights) = weights_on_max(10.0);
    let classifier = LogisticClassifier::new("clf-test", names, weights, -40.0, 0.5);

    let regressor = with_regressor.then(|| {
        let (names, weights) = weights_on_max(-100.0);
        Arc::new(LinearRegressor::new("reg-test", names, weights, 500.0))
            as Arc<dyn monitor_lib::predictor::Regressor>
    });

    Predictor::new(Some(Arc::new(classifier)), regressor)
}

async fn setup_test_app(with_regressor: bool) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::INGEST).await;
    health_registry.register(components::SINK).await;
    health_registry
        .set_model_loaded(ArtifactKind::Classifier, Ok(()))
        .await;

    let window = SharedWindow::new("vibration_rms_mm_s", 10);
    let service = PredictionService::new(
        Arc::new(predictor(with_regressor)),
        ServiceConfig::default(),
        window,
        StructuredLogger::new("test-motor"),
    );

    let state = Arc::new(AppState::new(
        health_registry,
        MonitorMetrics::new(),
        Arc::new(service),
    ));
    (create_router(state.clone()), state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn readings(values: &[f64]) -> String {
    let readings: Vec<Value> = values.iter().map(|v| json!({ "value": v })).collect();
    json!({ "readings": readings }).to_string()
}

#[tokio::test]
async fn test_spike_classified_as_failing() {
    let (app, _state) = setup_test_app(true).await;

    let (status, body) = post(
        app,
        "/predict/classification",
        readings(&[1.0, 1.2, 0.9, 5.0]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["will_fail_soon"], true);
    assert_eq!(body["confidence"], "High");
    assert_eq!(body["threshold_minutes"], 300);
}

#[tokio::test]
async fn test_legacy_reading_field_accepted() {
    let (app, _state) = setup_test_app(true).await;

    let body = json!({ "readings": [{ "vibration_rms": 1.0, "timestamp": 1700000000 }] });
    let (status, body) = post(app, "/predict/classification", body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["will_fail_soon"], false);
}

#[tokio::test]
async fn test_regression_status() {
    let (app, _state) = setup_test_app(true).await;

    let (status, body) = post(app, "/predict/regression", readings(&[1.0, 4.0])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["minutes_to_failure"], 100.0);
    assert_eq!(body["status"], "Warning");
}

#[tokio::test]
async fn test_empty_batch_is_422() {
    let (app, _state) = setup_test_app(true).await;

    let (status, body) = post(app, "/predict/both", readings(&[])).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("reading"));
}

#[tokio::test]
async fn test_malformed_body_is_422() {
    let (app, _state) = setup_test_app(true).await;

    let (status, body) = post(app, "/predict/both", r#"{"readings": "nope"}"#.to_string()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_missing_regressor_is_503() {
    let (app, _state) = setup_test_app(false).await;

    let (status, body) = post(app.clone(), "/predict/regression", readings(&[1.0])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "regression model not loaded");

    let (status, _) = post(app.clone(), "/predict/both", readings(&[1.0])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Classification still served
    let (status, _) = post(app, "/predict/classification", readings(&[1.0])).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_both_returns_combined_prediction() {
    let (app, _state) = setup_test_app(true).await;

    let (status, body) = post(app, "/predict/both", readings(&[0.5, 0.6])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classification"]["will_fail_soon"], false);
    assert_eq!(body["regression"]["status"], "Normal");
    assert_eq!(body["readings_used"], 2);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_live_prediction_follows_window() {
    let (app, state) = setup_test_app(true).await;

    let (status, _) = get(app.clone(), "/predict/live").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    for v in [1.0, 1.2, 0.9, 5.0] {
        state.service.window().push(v).await;
    }

    let (status, body) = get(app.clone(), "/predict/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classification"]["will_fail_soon"], true);
    assert_eq!(body["readings_used"], 4);

    let (status, body) = get(app, "/window").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel"], "vibration_rms_mm_s");
    assert_eq!(body["capacity"], 10);
    assert_eq!(body["readings"], json!([1.0, 1.2, 0.9, 5.0]));
}

#[tokio::test]
async fn test_health_reports_models() {
    let (app, state) = setup_test_app(false).await;
    state
        .health_registry
        .set_model_loaded(ArtifactKind::Regressor, Err("not found".into()))
        .await;

    let (status, body) = get(app, "/health").await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["models"]["classification"], true);
    assert_eq!(body["models"]["regression"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app(true).await;
    state
        .health_registry
        .set_unhealthy(components::INGEST, "stream closed")
        .await;

    let (status, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_tracks_initialisation() {
    let (app, state) = setup_test_app(true).await;

    let (status, body) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    state.health_registry.set_ready(true).await;

    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, state) = setup_test_app(true).await;
    state.metrics.inc_predictions_served();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("bearing_monitor_predictions_served_total"));
}
