//! Request tracing.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Echo the request ID on the response
//! - Open a trace span per request
//!
//! # Design Decisions
//! - Request ID set outermost so the trace span sees it
//! - Applied once, when the transport starts serving

use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Wrap `router` with request-id and trace layers.
pub fn with_request_tracing(router: Router) -> Router {
    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
