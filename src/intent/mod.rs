use serde::{Deserialize, Serialize};
use std::fmt;


/// Kind of guard attached to an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Only after a wall-clock time (`HH:MM`, 24-hour)
    AfterTime,
    /// Only when the occupancy entity reports someone home
    Presence,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::AfterTime => "after_time",
            ConditionKind::Presence => "presence",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime condition extracted from a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub value: String,
}

impl Condition {
    pub fn after_time(value: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::AfterTime,
            value: value.into(),
        }
    }

    /// Presence conditions always carry the literal "home".
    pub fn presence() -> Self {
        Self {
            kind: ConditionKind::Presence,
            value: "home".to_string(),
        }
    }
}

/// Action requested by a command.
///
/// Only `TurnOn` and `TurnOff` have an execution path; the rest are
/// representable but rejected at execute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TurnOn,
    TurnOff,
    SetScene,
    Notify,
    Schedule,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TurnOn => "turn_on",
            Action::TurnOff => "turn_off",
            Action::SetScene => "set_scene",
            Action::Notify => "notify",
            Action::Schedule => "schedule",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured representation of a recognized command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub action: Action,
    /// Free-text target phrase, e.g. "hallway light"
    pub target: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Intent {
    pub fn new(action: Action, target: impl Into<String>) -> Self {
        Self {
            action,
            target: target.into(),
            area: None,
            conditions: Vec::new(),
        }
    }

    /// "<action> <target>" plus " if k=v, k=v" when conditions exist
    pub fn summary(&self) -> String {
        let mut summary = format!("{} {}", self.action, self.target);
        if !self.conditions.is_empty() {
            let conds: Vec<String> = self
                .conditions
                .iter()
                .map(|c| format!("{}={}", c.kind, c.value))
                .collect();
            summary.push_str(" if ");
            summary.push_str(&conds.join(", "));
        }
        summary
    }
}

/// Intent plus resolution metadata, returned before any side effect.
///
/// The resolved ids are a snapshot taken at interpret time. They are part
/// of the declared shape so they survive the client round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub summary: String,
    pub intent: Intent,
    #[serde(default)]
    pub confirm_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_area_id: Option<String>,
}

impl Plan {
    /// Build a plan from an intent and the ids resolved for it.
    pub fn new(
        intent: Intent,
        resolved_entity_id: Option<String>,
        resolved_area_id: Option<String>,
    ) -> Self {
        Self {
            summary: intent.summary(),
            confirm_required: intent.action == Action::TurnOff,
            intent,
            resolved_entity_id,
            resolved_area_id,
        }
    }

    /// Structural checks on a plan submitted back by a client.
    ///
    /// A resolved id may come from the areas map, which holds free-form
    /// ids, so only blank ids are rejected here.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.intent.target.trim().is_empty() {
            return Err(PlanError::EmptyTarget);
        }
        if let Some(entity_id) = &self.resolved_entity_id {
            if entity_id.trim().is_empty() {
                return Err(PlanError::BlankEntityId);
            }
        }
        Ok(())
    }
}

/// Reasons a submitted plan is rejected before execution
#[derive(Debug, PartialEq)]
pub enum PlanError {
    EmptyTarget,
    BlankEntityId,
    MalformedEntityId(String),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::EmptyTarget => write!(f, "intent target is empty"),
            PlanError::BlankEntityId => write!(f, "resolved entity id is blank"),
            PlanError::MalformedEntityId(id) => {
                write!(f, "entity id '{}' is not of the form domain.object_id", id)
            }
        }
    }
}

impl std::error::Error for PlanError {}

/// Device entity ids look like "light.hallway": a domain, a dot, an object id.
pub fn validate_entity_id(entity_id: &str) -> Result<(), PlanError> {
    match entity_id.split_once('.') {
        Some((domain, object_id))
            if !domain.trim().is_empty() && !object_id.trim().is_empty() =>
        {
            Ok(())
        }
        _ => Err(PlanError::MalformedEntityId(entity_id.to_string())),
    }
}
