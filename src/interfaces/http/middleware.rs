//! Authentication middleware for Axum

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use super::error::ApiError;
use crate::application::IdentityService;
use crate::domain::DomainError;

/// Authentication error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    Rejected(String),
}

/// State for the authentication middleware
#[derive(Clone)]
pub struct AuthState {
    pub identity: Arc<IdentityService>,
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Bearer-token authentication middleware.
///
/// Resolves the token to a [`Session`](crate::domain::Session) and stores it
/// in the request extensions for handlers to extract.
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let Some(auth_header) = auth_header else {
        return auth_error_response(AuthError::MissingToken);
    };

    let Some(token) = extract_token(&auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    match auth_state.identity.session_from_token(token).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(DomainError::Unauthorized(reason)) => {
            debug!(reason = %reason, "Rejected bearer token");
            auth_error_response(AuthError::Rejected(reason))
        }
        Err(e) => ApiError(e).into_response(),
    }
}

fn auth_error_response(error: AuthError) -> Response {
    let message = match error {
        AuthError::MissingToken => "Missing authentication token".to_string(),
        AuthError::InvalidToken => "Invalid authentication token".to_string(),
        AuthError::Rejected(reason) => reason,
    };

    let body = Json(json!({
        "success": false,
        "data": null,
        "error": message
    }));

    (StatusCode::UNAUTHORIZED, body).into_response()
}
