// Intent model: conditions, intents, plans
pub mod intent;

// Name → entity directory and its persistence
pub mod directory;

// Prompt parsing strategies
pub mod parser;

// Control server adapter
pub mod control;

// Interpret/execute pipeline
pub mod orchestrator;

// HTTP API
pub mod api;

// Service configuration
pub mod config;

pub use intent::{Action, Condition, ConditionKind, Intent, Plan};
pub use orchestrator::{ExecutionReceipt, Orchestrator, PipelineError};
