//! Request-scoped user identity
//!
//! The auth middleware stores an [`AuthenticatedUser`] in the request
//! extensions. Only this crate can construct one, so a value found there
//! always came from a verified token.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::Extensions};

use super::middleware::AuthError;

/// Identity resolved from the bearer token of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    user_id: String,
}

impl AuthenticatedUser {
    pub(crate) fn new(user_id: String) -> Self {
        Self { user_id }
    }

    /// The token subject
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Read the identity placed by the auth middleware
    ///
    /// Fails with [`AuthError::IdentityMissing`] when the request did not
    /// pass through the middleware.
    pub fn from_extensions(extensions: &Extensions) -> Result<&Self, AuthError> {
        extensions.get::<Self>().ok_or(AuthError::IdentityMissing)
    }
}

/// Extract the identity in handlers:
///
/// ```ignore
/// async fn handler(user: AuthenticatedUser) -> String {
///     user.user_id().to_string()
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions).cloned()
    }
}
