//! Interpret/execute pipeline.
//!
//! `interpret` turns a prompt into a [`Plan`] with no side effects;
//! `execute` re-checks the plan's guards and performs the device call.
//! The two steps are independent and each can be retried on its own.

use crate::control::ControlServer;
use crate::directory::SharedDirectory;
use crate::intent::{Action, ConditionKind, Plan, PlanError};
use crate::parser::IntentParser;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Client-visible pipeline failures
#[derive(Debug)]
pub enum PipelineError {
    /// No intent recognized in the prompt
    ParseFailure,
    /// Plan has no resolved device
    ResolutionFailure,
    /// A presence guard was not satisfied
    ConditionFailure,
    /// Intent is valid but has no execution path
    UnsupportedAction(Action),
    /// Submitted plan failed structural validation
    InvalidPlan(PlanError),
    /// Control server call failed or timed out
    Transport(anyhow::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ParseFailure => write!(f, "Could not understand the command"),
            PipelineError::ResolutionFailure => {
                write!(f, "Unknown device. Add it to devices memory.")
            }
            PipelineError::ConditionFailure => write!(f, "Condition failed: no one is home"),
            PipelineError::UnsupportedAction(_) => write!(f, "Unsupported action in prototype"),
            PipelineError::InvalidPlan(e) => write!(f, "Invalid plan: {}", e),
            PipelineError::Transport(e) => write!(f, "Control server error: {:#}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Result of a successful `execute`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReceipt {
    pub status: String,
    pub executed: String,
    pub entity_id: String,
}

/// Composition root for the pipeline. All collaborators are injected.
pub struct Orchestrator {
    parser: IntentParser,
    directory: Arc<SharedDirectory>,
    control: Arc<dyn ControlServer>,
    presence_override: Option<String>,
}

impl Orchestrator {
    pub fn new(
        parser: IntentParser,
        directory: Arc<SharedDirectory>,
        control: Arc<dyn ControlServer>,
        presence_override: Option<String>,
    ) -> Self {
        Self {
            parser,
            directory,
            control,
            presence_override,
        }
    }

    pub fn directory(&self) -> &Arc<SharedDirectory> {
        &self.directory
    }

    /// Parse a prompt and resolve its target against the current directory.
    pub async fn interpret(&self, prompt: &str) -> Result<Plan, PipelineError> {
        let intent = self.parser.parse(prompt).await.ok_or_else(|| {
            info!(prompt, "Prompt not understood");
            PipelineError::ParseFailure
        })?;

        let directory = self.directory.snapshot();
        let entity_id = directory
            .resolve_device(&intent.target)
            .or_else(|| directory.resolve_area(&intent.target))
            .map(str::to_string);
        let area_id = intent
            .area
            .as_deref()
            .and_then(|area| directory.resolve_area(area))
            .map(str::to_string);

        let plan = Plan::new(intent, entity_id, area_id);
        info!(
            summary = %plan.summary,
            entity_id = plan.resolved_entity_id.as_deref().unwrap_or("-"),
            confirm_required = plan.confirm_required,
            "Prompt interpreted"
        );
        Ok(plan)
    }

    /// Presence entity for gates: the configured override, else the
    /// directory's default.
    pub fn presence_entity(&self) -> String {
        match &self.presence_override {
            Some(entity) => entity.clone(),
            None => self.directory.snapshot().presence_entity().to_string(),
        }
    }

    /// Check the plan's guards and perform its device action.
    ///
    /// Uses only the ids carried in the plan; the directory is not
    /// consulted again. `after_time` guards are not evaluated.
    pub async fn execute(&self, plan: &Plan) -> Result<ExecutionReceipt, PipelineError> {
        plan.validate().map_err(PipelineError::InvalidPlan)?;

        let presence_entity = self.presence_entity();
        for condition in &plan.intent.conditions {
            match condition.kind {
                ConditionKind::Presence => {
                    if !self.control.is_present(&presence_entity).await {
                        info!(
                            summary = %plan.summary,
                            presence_entity = %presence_entity,
                            "Presence gate failed"
                        );
                        return Err(PipelineError::ConditionFailure);
                    }
                }
                ConditionKind::AfterTime => {
                    debug!(value = %condition.value, "after_time condition not evaluated");
                }
            }
        }

        let entity_id = plan
            .resolved_entity_id
            .as_deref()
            .ok_or(PipelineError::ResolutionFailure)?;

        let outcome = match plan.intent.action {
            Action::TurnOn => self.control.turn_on(entity_id).await,
            Action::TurnOff => self.control.turn_off(entity_id).await,
            other => return Err(PipelineError::UnsupportedAction(other)),
        };
        outcome.map_err(|e| {
            warn!(entity_id, error = %e, "Device action failed");
            PipelineError::Transport(e)
        })?;

        info!(summary = %plan.summary, entity_id, "Plan executed");
        Ok(ExecutionReceipt {
            status: "ok".to_string(),
            executed: plan.summary.clone(),
            entity_id: entity_id.to_string(),
        })
    }
}
