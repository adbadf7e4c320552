//! Smart-home control server adapter.
//!
//! [`ControlServer`] is the seam the orchestrator depends on;
//! [`ControlClient`] is the HTTP implementation.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

mod client;

pub use client::ControlClient;

/// Remote operations the pipeline needs from the control server
#[async_trait]
pub trait ControlServer: Send + Sync {
    /// Invoke `domain.service` on an entity. Non-success responses are errors.
    async fn invoke_action(&self, domain: &str, service: &str, entity_id: &str) -> Result<Value>;

    /// Whether an occupancy entity reports someone present.
    ///
    /// Any failure reads as `false`: uncertain presence is treated as
    /// "nobody home" so gated commands do not fire.
    async fn is_present(&self, entity_id: &str) -> bool;

    async fn turn_on(&self, entity_id: &str) -> Result<Value> {
        self.invoke_action(domain_of(entity_id), "turn_on", entity_id)
            .await
    }

    async fn turn_off(&self, entity_id: &str) -> Result<Value> {
        self.invoke_action(domain_of(entity_id), "turn_off", entity_id)
            .await
    }
}

/// Text before the first `.` of an entity id ("light.hallway" → "light").
pub fn domain_of(entity_id: &str) -> &str {
    entity_id.split('.').next().unwrap_or(entity_id)
}

/// States that count as "someone is present"
pub fn is_present_state(state: &str) -> bool {
    state == "home" || state == "on"
}
