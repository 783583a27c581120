//! User profile handlers

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Public view of the current user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
}

/// Get the authenticated user's profile
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<UserInfo>, AppError> {
    let user = state.users.find_by_id(user.user_id()).await?;

    Ok(Json(UserInfo {
        id: user.id,
        email: user.email,
    }))
}
