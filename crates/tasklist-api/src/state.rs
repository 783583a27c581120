//! Application state management

use crate::auth::{AuthService, TokenAuthority};
use crate::error::AppError;
use std::sync::Arc;
use std::time::Instant;
use tasklist_core::{
    AppConfig, InMemoryTaskRepository, InMemoryUserRepository, TaskService, UserService,
};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Token authority, built once at startup
    pub authority: Arc<TokenAuthority>,
    pub auth: AuthService,
    pub users: UserService,
    pub tasks: TaskService,
}

impl AppState {
    /// Create state backed by in-memory repositories
    pub fn new(config: AppConfig, authority: Arc<TokenAuthority>) -> Self {
        let users = UserService::new(Arc::new(InMemoryUserRepository::new()));
        let tasks = TaskService::new(Arc::new(InMemoryTaskRepository::new()));
        let auth = AuthService::new(users.clone(), authority.clone(), config.auth.token_ttl());

        Self {
            config,
            start_time: Instant::now(),
            authority,
            auth,
            users,
            tasks,
        }
    }

    /// Register the accounts listed in the configuration
    pub async fn seed_users(&self) -> Result<usize, AppError> {
        for seed in &self.config.seed_users {
            self.auth
                .register(seed.id.clone(), &seed.email, &seed.password)
                .await?;
        }
        Ok(self.config.seed_users.len())
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::test_keys::PKCS1_PEM;
    use crate::auth::LoginRequest;
    use tasklist_core::SeedUser;

    #[tokio::test]
    async fn test_seed_users_can_log_in() {
        let mut config = AppConfig::default();
        config.seed_users = vec![SeedUser {
            id: Some("u1".to_string()),
            email: "alice@example.com".to_string(),
            password: "secret".to_string(),
        }];
        let authority = Arc::new(TokenAuthority::from_pem("tasklist", PKCS1_PEM).unwrap());
        let state = AppState::new(config, authority);

        assert_eq!(state.seed_users().await.unwrap(), 1);
        assert_eq!(state.users.find_by_id("u1").await.unwrap().email, "alice@example.com");

        let response = state
            .auth
            .login(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(state.authority.verify(&response.token).unwrap(), "u1");
    }
}
