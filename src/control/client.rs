use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use super::{is_present_state, ControlServer};
use crate::config::ControlConfig;

/// Body of `GET /api/states/{entity_id}`
#[derive(Debug, Deserialize)]
struct EntityState {
    #[serde(default = "unknown_state")]
    state: String,
}

fn unknown_state() -> String {
    "unknown".to_string()
}

/// HTTP client for the control server REST API.
///
/// Every request carries the bearer token and is bounded by the
/// configured timeout.
pub struct ControlClient {
    http_client: Client,
    base_url: String,
    token: String,
}

impl ControlClient {
    pub fn new(config: &ControlConfig) -> Result<Self> {
        Self::with_timeout(
            &config.base_url,
            config.token.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    /// Client against an explicit base URL (used with a mock server in tests).
    pub fn with_timeout(base_url: &str, token: String, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("intent-bridge/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_state(&self, entity_id: &str) -> Result<EntityState> {
        let url = format!(
            "{}/api/states/{}",
            self.base_url,
            urlencoding::encode(entity_id)
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to send state request")?;

        if response.status() != StatusCode::OK {
            return Err(anyhow!("State query returned {}", response.status()));
        }
        response
            .json::<EntityState>()
            .await
            .context("Failed to parse state response")
    }
}

#[async_trait]
impl ControlServer for ControlClient {
    async fn invoke_action(&self, domain: &str, service: &str, entity_id: &str) -> Result<Value> {
        let url = format!(
            "{}/api/services/{}/{}",
            self.base_url,
            urlencoding::encode(domain),
            urlencoding::encode(service)
        );
        info!(domain, service, entity_id, "Invoking device action");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({ "entity_id": entity_id }))
            .send()
            .await
            .context("Failed to send action request")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Control server returned {} for {}.{}", status, domain, service));
        }

        let body = response
            .text()
            .await
            .context("Failed to read action response")?;
        if body.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&body).context("Failed to parse action response")
    }

    async fn is_present(&self, entity_id: &str) -> bool {
        match self.fetch_state(entity_id).await {
            Ok(entity) => is_present_state(&entity.state),
            Err(e) => {
                warn!(entity_id, error = %e, "Presence check failed, treating as nobody home");
                false
            }
        }
    }
}
