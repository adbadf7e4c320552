use super::IntentStrategy;
use crate::intent::Intent;
use async_trait::async_trait;
use tracing::debug;

/// Fallback parser backed by a hosted language model.
///
/// Not wired to a model yet: it never produces an intent. Without an API
/// key it reports itself unavailable; with one it still declines.
pub struct SemanticParser {
    api_key: Option<String>,
}

impl SemanticParser {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl IntentStrategy for SemanticParser {
    fn name(&self) -> &str {
        "semantic"
    }

    async fn try_parse(&self, _prompt: &str) -> Option<Intent> {
        if !self.is_configured() {
            debug!("Semantic parser unavailable: no API key configured");
            return None;
        }
        debug!("Semantic parser has no model binding, declining");
        None
    }
}
