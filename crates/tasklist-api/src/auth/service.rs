//! Authentication service layer
//!
//! Exchanges email and password for a bearer token, and registers the
//! accounts the server is configured with.

use super::password::{hash_password, verify_password};
use super::token::TokenAuthority;
use crate::error::AppError;
use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tasklist_core::{TasklistError, UserService};

/// Longest accepted email address and password
pub const MAX_CREDENTIAL_LEN: usize = 100;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex");
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Shape checks that run before any lookup
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AppError::BadRequest("password is empty".to_string()));
        }
        if self.password.chars().count() > MAX_CREDENTIAL_LEN {
            return Err(AppError::BadRequest(format!(
                "password exceeds {MAX_CREDENTIAL_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if email.chars().count() > MAX_CREDENTIAL_LEN {
        return Err(AppError::BadRequest(format!(
            "email exceeds {MAX_CREDENTIAL_LEN} characters"
        )));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::BadRequest("Invalid email format".to_string()));
    }
    Ok(())
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    authority: Arc<TokenAuthority>,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(users: UserService, authority: Arc<TokenAuthority>, token_ttl: Duration) -> Self {
        Self {
            users,
            authority,
            token_ttl,
        }
    }

    /// Login with email and password
    ///
    /// An unknown email and a wrong password produce the same error.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        request.validate()?;

        let user = match self.users.find_by_email(&request.email).await {
            Ok(user) => user,
            Err(TasklistError::NotFound(_)) => {
                tracing::debug!("Login for unknown email");
                return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.authority.issue(&user.id, self.token_ttl)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse { token })
    }

    /// Hash the password and store a new account
    pub async fn register(
        &self,
        id: Option<String>,
        email: &str,
        password: &str,
    ) -> Result<String, AppError> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AppError::BadRequest("password is empty".to_string()));
        }

        let password_hash = hash_password(password)?;
        let id = self.users.register(id, email, &password_hash).await?;
        tracing::info!(user_id = %id, "User registered");
        Ok(id)
    }
}
