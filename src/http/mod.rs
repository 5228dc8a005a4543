//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! plugin records
//!     → transport.rs register (capabilities: files, views, schemes, named handlers)
//! route descriptors
//!     → transport.rs route (method filter, handler, auth.rs middleware)
//!     → Axum Router
//! start
//!     → request.rs (request ID, trace span)
//!     → axum::serve on the bound listener
//! ```

pub mod auth;
pub mod request;
pub mod transport;

pub use auth::{AuthScheme, BearerScheme};
pub use request::{with_request_tracing, X_REQUEST_ID};
pub use transport::{HttpTransport, MountedRoute, ServerInfo};
