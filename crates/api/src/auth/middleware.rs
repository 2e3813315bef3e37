//! Authentication middleware for Axum
//!
//! Every request passes through [`require_auth`]. Two kinds of request are let
//! through without a token: the playground page, and the operations that
//! mint credentials (`login`, `register`). Everything else needs a valid
//! `Authorization: Bearer <jwt>` header.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header::AUTHORIZATION, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::jwt::JwtManager;

/// Operation names that create a credential and so cannot require one.
/// Matched literally; other casings still need a token.
pub const PUBLIC_OPERATIONS: &[&str] = &["login", "register", "Login", "Register"];

/// Identity attached to playground requests
pub const PLAYGROUND_USER_ID: &str = "1";

/// Authenticated identity for the current request, stored in request extensions
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    /// Subject of the verified token, the playground placeholder, or `None`
    /// for a public operation
    pub user_id: Option<String>,
    pub auth_method: AuthMethod,
}

impl AuthUser {
    pub fn jwt(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            auth_method: AuthMethod::Jwt,
        }
    }

    pub fn playground() -> Self {
        Self {
            user_id: Some(PLAYGROUND_USER_ID.to_string()),
            auth_method: AuthMethod::Playground,
        }
    }

    pub fn public_operation() -> Self {
        Self {
            user_id: None,
            auth_method: AuthMethod::PublicOperation,
        }
    }

    /// Get user_id, returning an error if the request is unauthenticated
    pub fn require_user_id(&self) -> Result<&str, AuthError> {
        self.user_id.as_deref().ok_or(AuthError::MissingAuth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Jwt,
    Playground,
    PublicOperation,
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
    /// Exact path of the playground page
    pub playground_path: String,
    /// Upper bound on the body read while looking for `operationName`
    pub max_body_bytes: usize,
}

#[derive(Deserialize)]
struct OperationEnvelope {
    #[serde(rename = "operationName")]
    operation_name: Option<String>,
}

/// Extract `operationName` from a JSON body, if there is one
fn operation_name(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<OperationEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.operation_name)
}

pub fn is_public_operation(name: &str) -> bool {
    PUBLIC_OPERATIONS.contains(&name)
}

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidAuthFormat)
}

/// Read the whole body and put an identical copy back into the request
async fn buffer_body(request: Request, limit: usize) -> Result<(Request, Bytes), AuthError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::warn!(error = %e, "require_auth: failed to read request body");
        AuthError::UnreadableBody
    })?;

    let request = Request::from_parts(parts, Body::from(bytes.clone()));
    Ok((request, bytes))
}

/// Middleware that requires authentication unless a bypass rule matches
///
/// Bypass rules are checked before the Authorization header is looked at, so
/// a bypassed request is never rejected for a missing or bad token.
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if path == auth_state.playground_path {
        tracing::debug!(path = %path, "require_auth: playground request, bypassing authentication");
        request.extensions_mut().insert(AuthUser::playground());
        return next.run(request).await;
    }

    if carries_body(request.method()) {
        let (buffered, body) = match buffer_body(request, auth_state.max_body_bytes).await {
            Ok(parts) => parts,
            Err(err) => return err.into_response(),
        };
        request = buffered;

        if let Some(operation) = operation_name(&body) {
            if is_public_operation(&operation) {
                tracing::debug!(path = %path, operation = %operation, "require_auth: public operation, bypassing authentication");
                request.extensions_mut().insert(AuthUser::public_operation());
                return next.run(request).await;
            }
        }
    }

    let token = match extract_bearer_token(&request) {
        Ok(token) => token,
        Err(err) => {
            tracing::warn!(path = %path, error = ?err, "require_auth: no usable Authorization header");
            return err.into_response();
        }
    };

    match auth_state.jwt_manager.verify(token) {
        Ok(user_id) => {
            tracing::debug!(path = %path, user_id = %user_id, "require_auth: authentication successful");
            request.extensions_mut().insert(AuthUser::jwt(user_id));
            next.run(request).await
        }
        Err(reason) => {
            // The client only ever sees the generic message
            tracing::warn!(path = %path, reason = ?reason, "require_auth: token rejected");
            AuthError::InvalidToken.into_response()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingAuth,
    #[error("Invalid Authorization header format")]
    InvalidAuthFormat,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Failed to read request body")]
    UnreadableBody,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingAuth | AuthError::InvalidAuthFormat | AuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::UnreadableBody => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}
