//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, tasks, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new().route("/auth/login", post(auth::login_handler));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/users/me", get(users::me_handler))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/:id", delete(tasks::delete_task))
        .route("/tasks/:id/name", put(tasks::rename_task))
        .route("/tasks/:id/complete", post(tasks::complete_task))
        .route("/tasks/:id/uncomplete", post(tasks::uncomplete_task))
        .route_layer(middleware::from_fn_with_state(
            state.authority.clone(),
            auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}
