use super::*;
use crate::directory::DeviceDirectory;
use crate::intent::{Condition, Intent};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

/// Records every call; presence and action outcomes are fixed per test.
struct FakeControl {
    present: bool,
    fail_actions: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeControl {
    fn new(present: bool) -> Arc<Self> {
        Arc::new(Self {
            present,
            fail_actions: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            present: true,
            fail_actions: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn action_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("state "))
            .collect()
    }
}

#[async_trait]
impl ControlServer for FakeControl {
    async fn invoke_action(&self, domain: &str, service: &str, entity_id: &str) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}.{} {}", domain, service, entity_id));
        if self.fail_actions {
            return Err(anyhow!("connection timed out"));
        }
        Ok(json!({}))
    }

    async fn is_present(&self, entity_id: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push(format!("state {}", entity_id));
        self.present
    }
}

fn directory() -> DeviceDirectory {
    let mut directory = DeviceDirectory::default();
    directory.upsert_device("Hallway Light", "light.hallway");
    directory.upsert_device("kitchen lamp", "switch.kitchen_lamp");
    directory.upsert_area("hallway", "hallway");
    directory.upsert_area("garage light", "garage");
    directory.upsert_area("porch light", "porch");
    directory
}

fn orchestrator(control: Arc<FakeControl>) -> Orchestrator {
    orchestrator_with(control, None)
}

fn orchestrator_with(control: Arc<FakeControl>, presence_override: Option<&str>) -> Orchestrator {
    Orchestrator::new(
        IntentParser::with_defaults(None),
        Arc::new(SharedDirectory::in_memory(directory())),
        control,
        presence_override.map(str::to_string),
    )
}

fn plan_with(action: Action, entity_id: Option<&str>, conditions: Vec<Condition>) -> Plan {
    let mut intent = Intent::new(action, "hallway light");
    intent.conditions = conditions;
    Plan::new(intent, entity_id.map(str::to_string), None)
}

#[tokio::test]
async fn test_interpret_resolves_known_device() {
    let orch = orchestrator(FakeControl::new(true));

    let plan = orch.interpret("Turn on the hallway light").await.unwrap();

    assert_eq!(plan.summary, "turn_on hallway light");
    assert_eq!(plan.intent.action, Action::TurnOn);
    assert_eq!(plan.resolved_entity_id.as_deref(), Some("light.hallway"));
    assert_eq!(plan.resolved_area_id.as_deref(), Some("hallway"));
    assert!(!plan.confirm_required);
}

#[tokio::test]
async fn test_interpret_falls_back_to_area_for_target() {
    let orch = orchestrator(FakeControl::new(true));

    let plan = orch.interpret("switch off the garage light").await.unwrap();

    assert_eq!(plan.resolved_entity_id.as_deref(), Some("garage"));
    assert_eq!(plan.resolved_area_id.as_deref(), None);
    assert!(plan.confirm_required);
}

#[tokio::test]
async fn test_round_trip_through_area_resolution() {
    let control = FakeControl::new(true);
    let orch = orchestrator(control.clone());

    let plan = orch
        .interpret("turn on the porch light if someone is home")
        .await
        .unwrap();
    assert_eq!(plan.resolved_entity_id.as_deref(), Some("porch"));

    let echoed: Plan = serde_json::from_value(serde_json::to_value(&plan).unwrap()).unwrap();
    let receipt = orch.execute(&echoed).await.unwrap();

    assert_eq!(receipt.entity_id, "porch");
    assert_eq!(
        control.calls(),
        vec!["state group.family", "porch.turn_on porch"]
    );
}

#[tokio::test]
async fn test_interpret_unknown_target_still_plans() {
    let orch = orchestrator(FakeControl::new(true));

    let plan = orch.interpret("turn on the attic light").await.unwrap();

    assert_eq!(plan.intent.target, "attic light");
    assert_eq!(plan.resolved_entity_id, None);
    assert_eq!(plan.resolved_area_id, None);
}

#[tokio::test]
async fn test_interpret_summary_with_conditions() {
    let orch = orchestrator(FakeControl::new(true));

    let plan = orch
        .interpret("turn on the hallway light if it's after 7pm and someone is home")
        .await
        .unwrap();

    assert_eq!(
        plan.summary,
        "turn_on hallway light if after_time=19:00, presence=home"
    );
}

#[tokio::test]
async fn test_interpret_rejects_unparseable_prompt() {
    let control = FakeControl::new(true);
    let orch = orchestrator(control.clone());

    let err = orch.interpret("what's the weather like").await.unwrap_err();

    assert!(matches!(err, PipelineError::ParseFailure));
    assert_eq!(err.to_string(), "Could not understand the command");
    assert!(control.calls().is_empty());
}

#[tokio::test]
async fn test_round_trip_executes_resolved_device() {
    let control = FakeControl::new(true);
    let orch = orchestrator(control.clone());

    let plan = orch.interpret("turn off the kitchen lamp").await.unwrap();
    let echoed: Plan = serde_json::from_value(serde_json::to_value(&plan).unwrap()).unwrap();
    let receipt = orch.execute(&echoed).await.unwrap();

    assert_eq!(
        receipt,
        ExecutionReceipt {
            status: "ok".to_string(),
            executed: "turn_off kitchen lamp".to_string(),
            entity_id: "switch.kitchen_lamp".to_string(),
        }
    );
    assert_eq!(control.calls(), vec!["switch.turn_off switch.kitchen_lamp"]);
}

#[tokio::test]
async fn test_execute_uses_plan_snapshot_not_current_directory() {
    let control = FakeControl::new(true);
    let orch = orchestrator(control.clone());

    let plan = orch.interpret("turn on the hallway light").await.unwrap();
    orch.directory()
        .upsert_device("hallway light", "light.hallway_v2")
        .unwrap();
    let receipt = orch.execute(&plan).await.unwrap();

    assert_eq!(receipt.entity_id, "light.hallway");
    assert_eq!(control.calls(), vec!["light.turn_on light.hallway"]);
}

#[tokio::test]
async fn test_execute_presence_gate_blocks_device_call() {
    let control = FakeControl::new(false);
    let orch = orchestrator(control.clone());
    let plan = plan_with(
        Action::TurnOn,
        Some("light.hallway"),
        vec![Condition::presence()],
    );

    let err = orch.execute(&plan).await.unwrap_err();

    assert!(matches!(err, PipelineError::ConditionFailure));
    assert_eq!(err.to_string(), "Condition failed: no one is home");
    assert_eq!(control.calls(), vec!["state group.family"]);
    assert!(control.action_calls().is_empty());
}

#[tokio::test]
async fn test_execute_presence_gate_checked_before_resolution() {
    let control = FakeControl::new(false);
    let orch = orchestrator(control.clone());
    let plan = plan_with(Action::TurnOn, None, vec![Condition::presence()]);

    let err = orch.execute(&plan).await.unwrap_err();
    assert!(matches!(err, PipelineError::ConditionFailure));
}

#[tokio::test]
async fn test_execute_presence_gate_passes() {
    let control = FakeControl::new(true);
    let orch = orchestrator(control.clone());
    let plan = plan_with(
        Action::TurnOn,
        Some("light.hallway"),
        vec![Condition::presence()],
    );

    orch.execute(&plan).await.unwrap();

    assert_eq!(
        control.calls(),
        vec!["state group.family", "light.turn_on light.hallway"]
    );
}

#[tokio::test]
async fn test_presence_override_takes_precedence() {
    let control = FakeControl::new(true);
    let orch = orchestrator_with(control.clone(), Some("binary_sensor.occupancy"));
    let plan = plan_with(
        Action::TurnOn,
        Some("light.hallway"),
        vec![Condition::presence()],
    );

    orch.execute(&plan).await.unwrap();

    assert_eq!(control.calls()[0], "state binary_sensor.occupancy");
}

#[tokio::test]
async fn test_presence_entity_from_directory() {
    let orch = orchestrator(FakeControl::new(true));
    assert_eq!(orch.presence_entity(), "group.family");

    orch.directory().set_presence_entity("person.alex").unwrap();
    assert_eq!(orch.presence_entity(), "person.alex");
}

#[tokio::test]
async fn test_execute_unknown_device() {
    let control = FakeControl::new(true);
    let orch = orchestrator(control.clone());

    let plan = orch.interpret("turn on the attic light").await.unwrap();
    let err = orch.execute(&plan).await.unwrap_err();

    assert!(matches!(err, PipelineError::ResolutionFailure));
    assert_eq!(err.to_string(), "Unknown device. Add it to devices memory.");
    assert!(control.calls().is_empty());
}

#[tokio::test]
async fn test_execute_unsupported_actions() {
    for action in [Action::SetScene, Action::Notify, Action::Schedule] {
        let control = FakeControl::new(true);
        let orch = orchestrator(control.clone());
        let plan = plan_with(action, Some("scene.evening"), vec![]);

        let err = orch.execute(&plan).await.unwrap_err();

        assert!(matches!(err, PipelineError::UnsupportedAction(a) if a == action));
        assert_eq!(err.to_string(), "Unsupported action in prototype");
        assert!(control.calls().is_empty());
    }
}

#[tokio::test]
async fn test_execute_transport_failure_propagates() {
    let control = FakeControl::failing();
    let orch = orchestrator(control.clone());
    let plan = plan_with(Action::TurnOn, Some("light.hallway"), vec![]);

    let err = orch.execute(&plan).await.unwrap_err();

    assert!(matches!(err, PipelineError::Transport(_)));
    assert!(err.to_string().contains("connection timed out"));
}

#[tokio::test]
async fn test_execute_rejects_blank_entity_before_any_call() {
    let control = FakeControl::new(true);
    let orch = orchestrator(control.clone());
    let plan = plan_with(
        Action::TurnOn,
        Some("  "),
        vec![Condition::presence()],
    );

    let err = orch.execute(&plan).await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidPlan(PlanError::BlankEntityId)));
    assert!(control.calls().is_empty());
}

/// after_time guards are carried but not enforced: a plan gated on a time
/// that has not come yet still executes.
#[tokio::test]
async fn test_after_time_condition_is_not_evaluated() {
    let control = FakeControl::new(true);
    let orch = orchestrator(control.clone());
    let plan = plan_with(
        Action::TurnOn,
        Some("light.hallway"),
        vec![Condition::after_time("23:59")],
    );

    orch.execute(&plan).await.unwrap();

    assert_eq!(control.calls(), vec!["light.turn_on light.hallway"]);
}
