//! Tasklist API Server
//!
//! REST API server for per-user task lists.

use anyhow::Context;
use std::sync::Arc;
use tasklist_api::{auth::TokenAuthority, create_router, state::AppState};
use tasklist_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},tasklist_api=debug,tower_http=debug",
            config.logging.level
        ))
    });
    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Token authority is built once; a bad key or issuer is fatal
    let authority = TokenAuthority::new(&config.auth.issuer, &config.auth.private_key_path)
        .context("Failed to initialize token authority")?
        .require_issuer(config.auth.validate_issuer);
    let authority = Arc::new(authority);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, authority));
    let seeded = state
        .seed_users()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed users: {e:?}"))?;
    tracing::info!(count = seeded, "Seeded users");

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Tasklist API Server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
