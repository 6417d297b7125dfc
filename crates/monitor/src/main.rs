//! Bearing Monitor - motor telemetry ingestion and bearing failure prediction
//!
//! Reads the motor controller's telemetry stream, keeps the reading window
//! and CSV log current, and serves failure predictions over HTTP.

use anyhow::{Context, Result};
use bearing_monitor::{
    api,
    config::{ByteSource, MonitorConfig},
};
use monitor_lib::{
    health::{components, HealthRegistry},
    ingest::{CsvSink, IngestConfig, IngestPipeline, IngestStats, SharedWindow},
    observability::{MonitorMetrics, StructuredLogger},
    predictor::{
        load_classifier, load_regressor, PredictionService, Predictor, ServiceConfig,
    },
    ArtifactKind,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = MonitorConfig::load()?;
    let source = config.byte_source()?;
    info!(device = %config.device_id, source = %config.source, "Monitor configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::INGEST).await;
    health_registry.register(components::SINK).await;

    let metrics = MonitorMetrics::new();
    let logger = StructuredLogger::new(&config.device_id);
    logger.log_startup(MONITOR_VERSION, &config.source);

    let predictor = load_predictor(&config, &health_registry, &metrics, &logger).await;

    let window = SharedWindow::new(&config.channel, config.window_capacity);
    let service = Arc::new(PredictionService::new(
        Arc::new(predictor),
        ServiceConfig {
            bearing_window: config.window_capacity,
            ..ServiceConfig::default()
        },
        window.clone(),
        logger.clone(),
    ));

    let sink = CsvSink::open(&config.csv_path)
        .with_context(|| format!("Failed to open telemetry CSV {}", config.csv_path.display()))?;
    let pipeline = IngestPipeline::new(
        IngestConfig {
            framing: config.framing,
            channel: config.channel.clone(),
            read_chunk_size: config.read_chunk_size,
            max_frame_bytes: config.max_frame_bytes,
        },
        window,
        Arc::new(sink),
        logger.clone(),
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let ingest_health = health_registry.clone();
    let ingest_shutdown = shutdown_tx.subscribe();
    let ingest_handle = tokio::spawn(async move {
        match run_ingest(source, pipeline, ingest_shutdown).await {
            Ok(stats) => {
                info!(
                    bytes_read = stats.bytes_read,
                    sink_errors = stats.sink_errors,
                    "Ingestion finished"
                );
                ingest_health
                    .set_degraded(components::INGEST, "telemetry stream ended")
                    .await;
            }
            Err(e) => {
                error!(error = %e, "Telemetry ingestion failed");
                ingest_health
                    .set_unhealthy(components::INGEST, e.to_string())
                    .await;
            }
        }
    });

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        service,
    ));
    let api_handle = tokio::spawn(api::serve(
        config.api_port,
        app_state,
        shutdown_tx.subscribe(),
    ));

    health_registry.set_ready(true).await;

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());

    if let Err(e) = ingest_handle.await {
        error!(error = %e, "Ingestion task panicked");
    }
    match api_handle.await {
        Ok(Err(e)) => error!(error = %e, "API server failed"),
        Err(e) => error!(error = %e, "API server task panicked"),
        Ok(Ok(())) => {}
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load both artifacts; a failed load leaves that prediction kind unavailable
async fn load_predictor(
    config: &MonitorConfig,
    health: &HealthRegistry,
    metrics: &MonitorMetrics,
    logger: &StructuredLogger,
) -> Predictor {
    let classifier = load_classifier(&config.classifier_manifest);
    let outcome = classifier
        .as_ref()
        .map(|c| c.version().to_string())
        .map_err(|e| e.to_string());
    record_load(
        ArtifactKind::Classifier,
        &config.classifier_manifest,
        outcome,
        health,
        metrics,
        logger,
    )
    .await;

    let regressor = load_regressor(&config.regressor_manifest);
    let outcome = regressor
        .as_ref()
        .map(|r| r.version().to_string())
        .map_err(|e| e.to_string());
    record_load(
        ArtifactKind::Regressor,
        &config.regressor_manifest,
        outcome,
        health,
        metrics,
        logger,
    )
    .await;

    Predictor::new(classifier.ok(), regressor.ok())
}

async fn record_load(
    kind: ArtifactKind,
    path: &Path,
    outcome: Result<String, String>,
    health: &HealthRegistry,
    metrics: &MonitorMetrics,
    logger: &StructuredLogger,
) {
    let path = path.display().to_string();
    match outcome {
        Ok(version) => {
            logger.log_artifact_load(kind, &path, Ok(&version));
            metrics.set_artifact_version(kind, &version);
            health.set_model_loaded(kind, Ok(())).await;
        }
        Err(error) => {
            logger.log_artifact_load(kind, &path, Err(&error));
            health.set_model_loaded(kind, Err(error)).await;
        }
    }
}

/// Open the configured byte source and ingest until EOF or shutdown
async fn run_ingest(
    source: ByteSource,
    pipeline: IngestPipeline,
    shutdown: broadcast::Receiver<()>,
) -> Result<IngestStats> {
    match source {
        ByteSource::Stdin => pipeline.run(tokio::io::stdin(), shutdown).await,
        ByteSource::File(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            pipeline.run(file, shutdown).await
        }
        ByteSource::Tcp(addr) => {
            let stream = tokio::net::TcpStream::connect(&addr)
                .await
                .with_context(|| format!("Failed to connect to {}", addr))?;
            info!(addr = %addr, "Connected to telemetry stream");
            pipeline.run(stream, shutdown).await
        }
    }
}
