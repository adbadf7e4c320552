// HTTP surface: pipeline endpoints and directory maintenance

mod directory;
mod pipeline;

pub use directory::create_directory_router;
pub use pipeline::{create_router, AppState};

use crate::orchestrator::PipelineError;
use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::cors::CorsLayer;

/// Error body shared by all endpoints
#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::ParseFailure => StatusCode::BAD_REQUEST,
            PipelineError::ResolutionFailure => StatusCode::BAD_REQUEST,
            PipelineError::ConditionFailure => StatusCode::PRECONDITION_FAILED,
            PipelineError::UnsupportedAction(_) => StatusCode::BAD_REQUEST,
            PipelineError::InvalidPlan(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Transport(_) => StatusCode::BAD_GATEWAY,
        };
        error_response(status, self.to_string())
    }
}

/// Handler failure: a pipeline error or a body that does not deserialize
#[derive(Debug)]
pub enum AppError {
    Pipeline(PipelineError),
    BadRequest(String),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Pipeline(e) => e.into_response(),
            AppError::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        }
    }
}

/// Deserialize a JSON request body, reporting failures in the `{"error"}` shape.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

/// Full application router with permissive CORS
pub fn create_app(state: AppState) -> Router {
    create_router(state.clone())
        .merge(create_directory_router(state))
        .layer(CorsLayer::permissive())
}
