//! Task handlers
//!
//! Every handler acts on behalf of the authenticated user; tasks owned by
//! someone else are reported as forbidden.

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tasklist_core::Task;

/// Task list response
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub total: usize,
}

/// Body for create and rename
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskNameRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub created_id: String,
}

/// List the caller's tasks, oldest first
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<TaskListResponse>, AppError> {
    let tasks = state.tasks.list(user.user_id()).await?;
    let total = tasks.len();

    Ok(Json(TaskListResponse { tasks, total }))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(request): Json<TaskNameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created_id = state.tasks.create(user.user_id(), &request.name).await?;

    Ok((StatusCode::CREATED, Json(CreateTaskResponse { created_id })))
}

pub async fn rename_task(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<TaskNameRequest>,
) -> Result<StatusCode, AppError> {
    state
        .tasks
        .rename(&id, user.user_id(), &request.name)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tasks.set_completed(&id, user.user_id(), true).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn uncomplete_task(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tasks.set_completed(&id, user.user_id(), false).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tasks.delete(&id, user.user_id()).await?;

    Ok(StatusCode::NO_CONTENT)
}
