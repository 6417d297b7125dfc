//! Health check infrastructure for the bearing monitor
//!
//! Tracks the ingestion path, the telemetry sink and both decision
//! artifacts for the liveness, readiness and health endpoints.

use crate::error::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Which decision artifacts are loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAvailability {
    pub classification: bool,
    pub regression: bool,
}

impl ModelAvailability {
    pub fn any(&self) -> bool {
        self.classification || self.regression
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
    pub models: ModelAvailability,
    /// RFC 3339
    pub timestamp: String,
}

impl HealthResponse {
    /// Worst status across components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const INGEST: &str = "ingest";
    pub const SINK: &str = "sink";
    pub const CLASSIFIER: &str = "classifier";
    pub const REGRESSOR: &str = "regressor";

    pub fn for_artifact(kind: crate::error::ArtifactKind) -> &'static str {
        match kind {
            crate::error::ArtifactKind::Classifier => CLASSIFIER,
            crate::error::ArtifactKind::Regressor => REGRESSOR,
        }
    }
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    models: Arc<RwLock<ModelAvailability>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            models: Arc::new(RwLock::new(ModelAvailability::default())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Record an artifact load outcome
    ///
    /// A missing artifact degrades its component: the monitor keeps serving
    /// the other prediction kind.
    pub async fn set_model_loaded(&self, kind: ArtifactKind, loaded: Result<(), String>) {
        {
            let mut models = self.models.write().await;
            match kind {
                ArtifactKind::Classifier => models.classification = loaded.is_ok(),
                ArtifactKind::Regressor => models.regression = loaded.is_ok(),
            }
        }
        let name = components::for_artifact(kind);
        match loaded {
            Ok(()) => self.set_healthy(name).await,
            Err(reason) => self.set_degraded(name, reason).await,
        }
    }

    pub async fn models(&self) -> ModelAvailability {
        *self.models.read().await
    }

    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse {
            status,
            components,
            models: self.models().await,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Ready once initialised, with at least one artifact and nothing unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        let reason = if !ready {
            Some("Monitor not yet initialized")
        } else if !health.models.any() {
            Some("No decision artifact loaded")
        } else if !health.status.is_operational() {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn initialised() -> HealthRegistry {
        let registry = HealthRegistry::new();
        registry.register(components::INGEST).await;
        registry.register(components::SINK).await;
        registry
            .set_model_loaded(ArtifactKind::Classifier, Ok(()))
            .await;
        registry
            .set_model_loaded(ArtifactKind::Regressor, Ok(()))
            .await;
        registry.set_ready(true).await;
        registry
    }

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
        assert!(!health.models.any());
    }

    #[tokio::test]
    async fn test_missing_model_degrades() {
        let registry = HealthRegistry::new();
        registry.register(components::INGEST).await;
        registry
            .set_model_loaded(ArtifactKind::Regressor, Err("file not found".into()))
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(!health.models.regression);
        assert_eq!(
            health.components[components::REGRESSOR].message.as_deref(),
            Some("file not found")
        );
    }

    #[tokio::test]
    async fn test_unhealthy_component() {
        let registry = initialised().await;
        registry
            .set_unhealthy(components::INGEST, "stream closed")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert!(!registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_requires_a_model() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("No decision artifact loaded")
        );

        registry
            .set_model_loaded(ArtifactKind::Classifier, Ok(()))
            .await;
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_readiness_ready_when_initialised() {
        let registry = initialised().await;
        let readiness = registry.readiness().await;
        assert!(readiness.ready);
        assert!(readiness.reason.is_none());
    }
}
