//! Domain services
//!
//! Input validation sits here, between handlers and repositories; ownership
//! is checked by the repository in the same step as the change. The caller's
//! user id always comes from the authenticated request, never from the
//! request body.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::repository::{TaskRepository, UserRepository};
use crate::{validate_id, Result, Task, TasklistError, User};

/// Task operations scoped to the owning user
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    /// List the caller's tasks
    pub async fn list(&self, user_id: &str) -> Result<Vec<Task>> {
        validate_id("user_id", user_id)?;
        self.repo.find_by_user_id(user_id).await
    }

    /// Create a task owned by the caller
    pub async fn create(&self, user_id: &str, name: &str) -> Result<String> {
        validate_id("user_id", user_id)?;
        let task = Task::new(Uuid::new_v4().to_string(), user_id, name, Utc::now())?;
        let id = self.repo.create(task).await?;
        debug!(task_id = %id, user_id, "task created");
        Ok(id)
    }

    /// Rename one of the caller's tasks
    pub async fn rename(&self, id: &str, user_id: &str, name: &str) -> Result<()> {
        validate_id("id", id)?;
        validate_id("user_id", user_id)?;
        let name = name.to_string();
        self.repo
            .update_owned(
                id,
                user_id,
                Box::new(move |task: &mut Task| {
                    task.name = name;
                    task.updated_at = Utc::now();
                }),
            )
            .await?;
        Ok(())
    }

    /// Mark one of the caller's tasks as completed or not
    pub async fn set_completed(&self, id: &str, user_id: &str, completed: bool) -> Result<()> {
        validate_id("id", id)?;
        validate_id("user_id", user_id)?;
        self.repo
            .update_owned(
                id,
                user_id,
                Box::new(move |task: &mut Task| {
                    task.is_completed = completed;
                    task.updated_at = Utc::now();
                }),
            )
            .await?;
        Ok(())
    }

    /// Delete one of the caller's tasks
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<()> {
        validate_id("id", id)?;
        validate_id("user_id", user_id)?;
        self.repo.delete_owned(id, user_id).await?;
        debug!(task_id = %id, user_id, "task deleted");
        Ok(())
    }
}

/// User lookups and registration
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<User> {
        validate_id("id", id)?;
        self.repo.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User> {
        if email.is_empty() {
            return Err(TasklistError::ValidationError("email is empty".to_string()));
        }
        self.repo.find_by_email(email).await
    }

    /// Store a user whose password is already hashed
    pub async fn register(
        &self,
        id: Option<String>,
        email: &str,
        password_hash: &str,
    ) -> Result<String> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        validate_id("id", &id)?;
        let user = User::new(id, email, password_hash, Utc::now())?;
        self.repo.create(user).await
    }
}
