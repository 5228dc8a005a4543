//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle events (plugin failures, route registration, listen):
//!     → logging.rs (Logger handed to the server)
//!
//! HTTP traffic:
//!     → http::request (x-request-id + TraceLayer spans)
//! ```
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Lifecycle messages go through an injected Logger so embedders can redirect them
//! - Request ID flows through every request span

pub mod logging;

pub use logging::{init_tracing, LogEntry, LogLevel, Logger, MemoryLogger, TracingLogger};
