//! Authentication API handlers

use crate::auth::{LoginRequest, LoginResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Exchange email and password for a bearer token
///
/// # Responses
///
/// * `200 OK` - `{"token": "..."}`
/// * `400 Bad Request` - Malformed email or password
/// * `401 Unauthorized` - Unknown email or wrong password
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = state.auth.login(request).await?;
    Ok(Json(response))
}
