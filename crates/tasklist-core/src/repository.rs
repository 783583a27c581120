//! Repository traits and in-memory stores
//!
//! Persistence is behind async traits so a database-backed store can
//! replace the in-memory one without touching the services.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{Result, Task, TasklistError, User};

/// User persistence operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by id
    async fn find_by_id(&self, id: &str) -> Result<User>;

    /// Find a user by email address
    async fn find_by_email(&self, email: &str) -> Result<User>;

    /// Store a new user, failing if the id or email is taken
    async fn create(&self, user: User) -> Result<String>;
}

/// Task persistence operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Find a task by id
    async fn find_by_id(&self, id: &str) -> Result<Task>;

    /// List tasks owned by a user, oldest first
    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Task>>;

    /// Store a new task and return its id
    async fn create(&self, task: Task) -> Result<String>;

    /// Apply `change` to a task owned by `user_id` and return the stored result.
    ///
    /// The ownership check, the change and validation happen atomically; a
    /// change that leaves the task invalid is not stored.
    async fn update_owned(&self, id: &str, user_id: &str, change: TaskChange) -> Result<Task>;

    /// Remove a task owned by `user_id`
    async fn delete_owned(&self, id: &str, user_id: &str) -> Result<()>;
}

/// A mutation applied to a task inside the repository
pub type TaskChange = Box<dyn FnOnce(&mut Task) + Send>;

/// In-memory user store
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<User> {
        self.users
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TasklistError::NotFound(format!("user {id}")))
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| TasklistError::NotFound("user".to_string()))
    }

    async fn create(&self, user: User) -> Result<String> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Err(TasklistError::RepositoryError(
                "user already exists".to_string(),
            ));
        }
        let id = user.id.clone();
        users.insert(id.clone(), user);
        Ok(id)
    }
}

/// In-memory task store
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn find_by_id(&self, id: &str) -> Result<Task> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TasklistError::NotFound(format!("task {id}")))
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn create(&self, task: Task) -> Result<String> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(TasklistError::RepositoryError(format!(
                "task {} already exists",
                task.id
            )));
        }
        let id = task.id.clone();
        tasks.insert(id.clone(), task);
        Ok(id)
    }

    async fn update_owned(&self, id: &str, user_id: &str, change: TaskChange) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks
            .get_mut(id)
            .ok_or_else(|| TasklistError::NotFound(format!("task {id}")))?;
        stored.ensure_owned_by(user_id)?;

        let mut updated = stored.clone();
        change(&mut updated);
        updated.validate()?;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete_owned(&self, id: &str, user_id: &str) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        tasks
            .get(id)
            .ok_or_else(|| TasklistError::NotFound(format!("task {id}")))?
            .ensure_owned_by(user_id)?;
        tasks.remove(id);
        Ok(())
    }
}
