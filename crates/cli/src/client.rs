//! API client for communicating with the bearing monitor daemon

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// API client for the monitor's HTTP API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Deserialize a success body, or surface the daemon's `detail` message
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn predict_classification(&self, readings: &[Reading]) -> Result<Classification> {
        self.post("predict/classification", &PredictRequest::new(readings))
            .await
    }

    pub async fn predict_regression(&self, readings: &[Reading]) -> Result<Regression> {
        self.post("predict/regression", &PredictRequest::new(readings))
            .await
    }

    pub async fn predict_both(&self, readings: &[Reading]) -> Result<DualPrediction> {
        self.post("predict/both", &PredictRequest::new(readings))
            .await
    }

    pub async fn predict_live(&self) -> Result<DualPrediction> {
        self.get("predict/live").await
    }

    pub async fn window(&self) -> Result<WindowSnapshot> {
        self.get("window").await
    }

    /// Health is reported even when the daemon answers 503
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.base_url.join("health").context("Invalid path")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;
        response.json().await.context("Failed to parse response")
    }
}

// API request/response types

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub readings: Vec<Reading>,
}

impl PredictRequest {
    fn new(readings: &[Reading]) -> Self {
        Self {
            readings: readings.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub will_fail_soon: bool,
    pub failure_probability: f64,
    pub confidence: String,
    pub threshold_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regression {
    pub minutes_to_failure: f64,
    pub hours_to_failure: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualPrediction {
    pub classification: Classification,
    pub regression: Regression,
    pub timestamp: String,
    pub readings_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub channel: String,
    pub capacity: usize,
    pub readings: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAvailability {
    pub classification: bool,
    pub regression: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub components: HashMap<String, ComponentHealth>,
    pub models: ModelAvailability,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
