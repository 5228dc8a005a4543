//! Auth schemes enforced by the transport.
//!
//! A route whose nested config names a scheme gets [`require_auth`] layered
//! in front of its handler. Schemes are registered on the transport by
//! plugins, usually the auth module or one of its post-registration hooks.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Decides whether a request may reach a protected route.
#[async_trait]
pub trait AuthScheme: Send + Sync {
    /// Inspect the request head. `Err` short-circuits with that status.
    async fn authenticate(&self, request: &Parts) -> Result<(), StatusCode>;
}

/// Accepts `Authorization: Bearer <token>` for any configured token.
#[derive(Debug, Clone)]
pub struct BearerScheme {
    tokens: Vec<String>,
}

impl BearerScheme {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl AuthScheme for BearerScheme {
    async fn authenticate(&self, request: &Parts) -> Result<(), StatusCode> {
        let presented = request
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if self.tokens.iter().any(|token| token == presented) {
            Ok(())
        } else {
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub(crate) async fn require_auth(
    State(scheme): State<Arc<dyn AuthScheme>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    match scheme.authenticate(&parts).await {
        Ok(()) => next.run(Request::from_parts(parts, body)).await,
        Err(status) => {
            tracing::debug!(path = %parts.uri.path(), status = %status, "Request rejected by auth scheme");
            status.into_response()
        }
    }
}
