/// Authentication middleware for protecting routes
///
/// Extracts the bearer token from the Authorization header and verifies it
/// with the shared [`TokenAuthority`]. On success, adds the
/// [`AuthenticatedUser`] to request extensions; otherwise the request is
/// rejected before reaching the handler.
use super::identity::AuthenticatedUser;
use super::token::TokenAuthority;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;

/// Authentication errors
///
/// Verification failures are deliberately not broken down further: an
/// expired token and a forged one look the same to the client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("No authenticated user on this request")]
    IdentityMissing,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = match self {
            AuthError::MissingCredentials | AuthError::InvalidToken => "UNAUTHENTICATED",
            AuthError::IdentityMissing => "IDENTITY_MISSING",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new(code, self.to_string())),
        )
            .into_response()
    }
}

/// Pull the token out of `Authorization`, with or without the `Bearer` prefix
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?
        .trim();

    let token = value.strip_prefix("Bearer").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(token)
}

/// Authentication middleware that requires a valid bearer token
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use tasklist_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(authority, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(authority): State<Arc<TokenAuthority>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?.to_owned();

    // RSA work stays off the async workers
    let user_id = tokio::task::spawn_blocking(move || authority.verify(&token))
        .await
        .map_err(|_| AuthError::InvalidToken)?
        .map_err(|_| AuthError::InvalidToken)?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser::new(user_id));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::test_keys::{FOREIGN_PKCS8_PEM, PKCS1_PEM};
    use axum::{body::Body, http::HeaderValue, middleware, routing::get, Router};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_variants() {
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers("Bearer    abc  ")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers("Bearerabc")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers("abc")).unwrap(), "abc");
    }

    #[test]
    fn test_bearer_token_missing() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers("")),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_auth_error_responses() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidToken,
            AuthError::IdentityMissing,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    /// Router whose handler counts invocations and echoes the user id
    fn app(authority: Arc<TokenAuthority>, calls: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(move |user: AuthenticatedUser| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        user.user_id().to_string()
                    }
                }),
            )
            .route_layer(middleware::from_fn_with_state(authority, auth_middleware))
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn authority() -> Arc<TokenAuthority> {
        Arc::new(TokenAuthority::from_pem("issuer", PKCS1_PEM).unwrap())
    }

    #[tokio::test]
    async fn test_no_header_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (status, _) = call(app(authority(), calls.clone()), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_token_resolves_identity() {
        let authority = authority();
        let token = authority.issue("u1", Duration::hours(1)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let (status, body) = call(
            app(authority.clone(), calls.clone()),
            Some(&format!("Bearer {token}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u1");

        // Prefix is optional
        let (status, body) = call(app(authority, calls.clone()), Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_foreign_token_rejected() {
        let foreign = TokenAuthority::from_pem("issuer", FOREIGN_PKCS8_PEM).unwrap();
        let token = foreign.issue("u1", Duration::hours(1)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let (status, body) = call(
            app(authority(), calls.clone()),
            Some(&format!("Bearer {token}")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("UNAUTHENTICATED"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_requests_resolve_own_identity() {
        let authority = authority();
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let user_id = format!("u{i}");
                let token = authority.issue(&user_id, Duration::hours(1)).unwrap();
                let app = app(authority.clone(), calls.clone());
                tokio::spawn(async move {
                    let response = call(app, Some(&format!("Bearer {token}"))).await;
                    (user_id, response)
                })
            })
            .collect();

        for handle in handles {
            let (user_id, (status, body)) = handle.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, user_id);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_expired_and_forged_look_identical() {
        let authority = authority();
        let expired = authority.issue("u1", Duration::hours(-1)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let expired_response = call(
            app(authority.clone(), calls.clone()),
            Some(&format!("Bearer {expired}")),
        )
        .await;
        let forged_response = call(
            app(authority, calls.clone()),
            Some("Bearer not-a-real-token"),
        )
        .await;

        assert_eq!(expired_response.0, StatusCode::UNAUTHORIZED);
        assert_eq!(expired_response, forged_response);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
