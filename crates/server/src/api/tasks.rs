//! Task API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use arxivist_core::{EnqueueRequest, Task};

use super::error::{from_orchestrator, ApiError};
use crate::state::AppState;

/// Maximum allowed limit for task listings
const MAX_LIMIT: usize = 1000;

/// Default limit for task listings
const DEFAULT_LIMIT: usize = 50;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
pub struct ListTasksParams {
    /// Maximum number of tasks to return
    pub limit: Option<usize>,
}

/// Response for listing tasks
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub session_id: String,
    pub tasks: Vec<Task>,
    pub limit: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Enqueue a fetch or translate request.
///
/// Returns 202 with the task; a cache hit comes back already SUCCEEDED.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state
        .orchestrator()
        .enqueue(request)
        .map_err(from_orchestrator)?;
    Ok((StatusCode::ACCEPTED, Json(task)))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .orchestrator()
        .get_task(&task_id)
        .map(Json)
        .map_err(from_orchestrator)
}

/// Forget a finished task. Returns the removed task.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .orchestrator()
        .remove_task(&task_id)
        .map(Json)
        .map_err(from_orchestrator)
}

pub async fn list_session_tasks(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<ListTasksParams>,
) -> Json<ListTasksResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let tasks = state.orchestrator().list_tasks(&session_id, limit);
    Json(ListTasksResponse {
        session_id,
        tasks,
        limit,
    })
}
