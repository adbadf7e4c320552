use super::{parse_json, AppError};
use crate::intent::Plan;
use crate::orchestrator::{ExecutionReceipt, Orchestrator};
use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Deserialize)]
pub struct InterpretRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct InterpretResponse {
    pub plan: Plan,
}

#[derive(Deserialize)]
pub struct ExecuteRequest {
    pub plan: Plan,
}

/// Pipeline endpoints plus the health check
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/interpret", post(interpret))
        .route("/execute", post(execute))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

/// POST /interpret - prompt → plan, no side effects
async fn interpret(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<InterpretResponse>, AppError> {
    let req: InterpretRequest = parse_json(&body)?;
    let plan = state.orchestrator.interpret(&req.prompt).await?;
    Ok(Json(InterpretResponse { plan }))
}

/// POST /execute - run a plan previously returned by /interpret
async fn execute(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ExecutionReceipt>, AppError> {
    let req: ExecuteRequest = parse_json(&body)?;
    let receipt = state.orchestrator.execute(&req.plan).await?;
    Ok(Json(receipt))
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}
