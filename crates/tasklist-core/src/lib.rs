//! Tasklist Core - Domain models, repositories, and shared types
//!
//! This crate defines the core abstractions used by the task-list service:
//! - User and task entities
//! - Common error types
//! - Repository traits and in-memory implementations
//! - Domain services (ownership checks)
//! - Configuration management

pub mod config;
pub mod repository;
pub mod service;

pub use config::{AppConfig, AuthConfig, ConfigError, LoggingConfig, SeedUser, ServerConfig};
pub use repository::{
    InMemoryTaskRepository, InMemoryUserRepository, TaskChange, TaskRepository, UserRepository,
};
pub use service::{TaskService, UserService};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for task-list operations
#[derive(Error, Debug)]
pub enum TasklistError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TasklistError>;

// ============================================================================
// Entities
// ============================================================================

/// Maximum length of any identifier accepted from a client
pub const MAX_ID_LEN: usize = 50;

/// Maximum length of a task name, in characters
pub const MAX_TASK_NAME_LEN: usize = 100;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string; never serialized to clients
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let user = Self {
            id: id.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
        };
        user.validate()?;
        Ok(user)
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(TasklistError::ValidationError("id is empty".to_string()));
        }
        if self.email.is_empty() {
            return Err(TasklistError::ValidationError("email is empty".to_string()));
        }
        if self.password_hash.is_empty() {
            return Err(TasklistError::ValidationError("password is empty".to_string()));
        }
        Ok(())
    }
}

/// A task owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let task = Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            is_completed: false,
            created_at: now,
            updated_at: now,
        };
        task.validate()?;
        Ok(task)
    }

    /// Check required fields and limits
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.user_id.is_empty() || self.name.is_empty() {
            return Err(TasklistError::ValidationError(
                "task id, owner and name are required".to_string(),
            ));
        }
        if self.name.chars().count() > MAX_TASK_NAME_LEN {
            return Err(TasklistError::ValidationError(format!(
                "name must be {MAX_TASK_NAME_LEN} characters or less"
            )));
        }
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// `PermissionDenied` unless `user_id` owns this task
    pub fn ensure_owned_by(&self, user_id: &str) -> Result<()> {
        if !self.is_owned_by(user_id) {
            return Err(TasklistError::PermissionDenied(format!(
                "task {} belongs to another user",
                self.id
            )));
        }
        Ok(())
    }
}

/// Reject empty or oversized identifiers
pub fn validate_id(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TasklistError::ValidationError(format!("{field} is empty")));
    }
    if value.chars().count() > MAX_ID_LEN {
        return Err(TasklistError::ValidationError(format!(
            "{field} must be {MAX_ID_LEN} characters or less"
        )));
    }
    Ok(())
}
