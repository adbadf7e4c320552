//! Prompt → Intent parsing.
//!
//! Parsing is a chain of [`IntentStrategy`] implementations tried in order;
//! the first one to return an intent wins. The default chain is the
//! pattern-rule parser followed by the semantic-model fallback.

use crate::intent::Intent;
use async_trait::async_trait;
use tracing::debug;

mod rules;
mod semantic;

pub use rules::RuleParser;
pub use semantic::SemanticParser;

/// One way of turning a prompt into an intent.
///
/// Returning `None` means "no match", which is a normal outcome and lets
/// the next strategy try.
#[async_trait]
pub trait IntentStrategy: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    async fn try_parse(&self, prompt: &str) -> Option<Intent>;
}

/// Ordered chain of strategies
pub struct IntentParser {
    strategies: Vec<Box<dyn IntentStrategy>>,
}

impl IntentParser {
    pub fn new(strategies: Vec<Box<dyn IntentStrategy>>) -> Self {
        Self { strategies }
    }

    /// Rule parser first, then the semantic fallback.
    pub fn with_defaults(semantic_api_key: Option<String>) -> Self {
        Self::new(vec![
            Box::new(RuleParser::new()),
            Box::new(SemanticParser::new(semantic_api_key)),
        ])
    }

    pub async fn parse(&self, prompt: &str) -> Option<Intent> {
        for strategy in &self.strategies {
            if let Some(intent) = strategy.try_parse(prompt).await {
                debug!(strategy = strategy.name(), action = %intent.action, "Prompt parsed");
                return Some(intent);
            }
            debug!(strategy = strategy.name(), "Strategy found no match");
        }
        None
    }
}
