//! Bearer token gate on the hub's REST surface.
//!
//! Layered over the `/api/v1` tree only; the Prometheus exposition
//! endpoint stays outside it so scrapers need no credentials. Failures
//! come back in the same `{"error": ...}` JSON shape as every other
//! API error.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::error::ApiError;

/// Shared secret agents and operators present as `Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().into())
    }
}

/// Rejects requests without a matching Bearer credential.
///
/// Missing header or a non-Bearer scheme is 401; a well-formed token
/// that does not match is 403.
pub async fn require_bearer(
    State(expected): State<BearerToken>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized("expected Authorization: Bearer <token>".to_string())
    })?;

    if token != expected.0.as_ref() {
        return Err(ApiError::Forbidden("invalid token".to_string()));
    }

    Ok(next.run(request).await)
}
