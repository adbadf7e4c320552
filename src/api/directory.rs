//! Directory maintenance endpoints.
//!
//! - `GET /directory` — current document
//! - `PUT|DELETE /directory/devices/:name`
//! - `PUT|DELETE /directory/areas/:name`
//! - `PUT /directory/presence`
//! - `POST /directory/reload` — re-read the backing file
//!
//! Every change is written through to disk before it becomes visible.

use super::{error_response, parse_json, AppState};
use crate::directory::{DeviceDirectory, SharedDirectory};
use crate::intent::validate_entity_id;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Deserialize)]
pub struct EntityBody {
    pub entity_id: String,
}

#[derive(Deserialize)]
pub struct AreaBody {
    pub area_id: String,
}

pub fn create_directory_router(state: AppState) -> Router {
    Router::new()
        .route("/directory", get(get_directory))
        .route(
            "/directory/devices/:name",
            put(put_device).delete(delete_device),
        )
        .route("/directory/areas/:name", put(put_area).delete(delete_area))
        .route("/directory/presence", put(put_presence))
        .route("/directory/reload", post(reload))
        .with_state(Arc::new(state))
}

fn directory(state: &AppState) -> &SharedDirectory {
    state.orchestrator.directory()
}

fn document(directory: &DeviceDirectory) -> Response {
    Json(directory).into_response()
}

fn save_failed(e: anyhow::Error) -> Response {
    error!(error = %e, "Failed to persist directory");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to save directory: {:#}", e),
    )
}

/// GET /directory
async fn get_directory(State(state): State<Arc<AppState>>) -> Response {
    document(&directory(&state).snapshot())
}

/// PUT /directory/devices/:name
async fn put_device(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let body: EntityBody = match parse_json(&body) {
        Ok(body) => body,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = validate_entity_id(&body.entity_id) {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }
    let shared = directory(&state);
    match shared.upsert_device(&name, &body.entity_id) {
        Ok(()) => {
            info!(name = %name, entity_id = %body.entity_id, "Device mapping saved");
            document(&shared.snapshot())
        }
        Err(e) => save_failed(e),
    }
}

/// DELETE /directory/devices/:name
async fn delete_device(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let shared = directory(&state);
    match shared.remove_device(&name) {
        Ok(true) => {
            info!(name = %name, "Device mapping removed");
            document(&shared.snapshot())
        }
        Ok(false) => error_response(StatusCode::NOT_FOUND, format!("No such device: {}", name)),
        Err(e) => save_failed(e),
    }
}

/// PUT /directory/areas/:name
async fn put_area(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let body: AreaBody = match parse_json(&body) {
        Ok(body) => body,
        Err(e) => return e.into_response(),
    };
    if body.area_id.trim().is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "area_id must not be empty");
    }
    let shared = directory(&state);
    match shared.upsert_area(&name, &body.area_id) {
        Ok(()) => {
            info!(name = %name, area_id = %body.area_id, "Area mapping saved");
            document(&shared.snapshot())
        }
        Err(e) => save_failed(e),
    }
}

/// DELETE /directory/areas/:name
async fn delete_area(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let shared = directory(&state);
    match shared.remove_area(&name) {
        Ok(true) => {
            info!(name = %name, "Area mapping removed");
            document(&shared.snapshot())
        }
        Ok(false) => error_response(StatusCode::NOT_FOUND, format!("No such area: {}", name)),
        Err(e) => save_failed(e),
    }
}

/// PUT /directory/presence
async fn put_presence(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let body: EntityBody = match parse_json(&body) {
        Ok(body) => body,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = validate_entity_id(&body.entity_id) {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }
    let shared = directory(&state);
    match shared.set_presence_entity(&body.entity_id) {
        Ok(()) => {
            info!(entity_id = %body.entity_id, "Presence entity saved");
            document(&shared.snapshot())
        }
        Err(e) => save_failed(e),
    }
}

/// POST /directory/reload
async fn reload(State(state): State<Arc<AppState>>) -> Response {
    let fresh = directory(&state).reload();
    info!(
        devices = fresh.devices.len(),
        areas = fresh.areas.len(),
        "Directory reloaded"
    );
    document(&fresh)
}
