//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! ServerBuilder (config, catalog, plugins, routes, route modules, logger)
//!     → build: resolve catalog names
//!     → Server [Uninitialized]
//!
//! init  [Initializing]:
//!     create transport → register plugins → run hooks → register routes
//!     → [Ready]
//!
//! start:
//!     [Uninitialized] → init → start
//!     [Ready] → bind → [Listening]
//! ```
//!
//! # Design Decisions
//! - Ordered startup: plugins, then hooks, then routes, then the listener
//! - Fail fast: any registration error is returned and nothing later runs
//! - Listener starts last (traffic only when ready)

pub mod server;

pub use server::{LifecycleState, Server, ServerBuilder};
