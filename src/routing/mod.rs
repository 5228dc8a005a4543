//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! config.routes, builder routes, call-time routes
//!   + discovery.rs (routes/index or routes/*/index)
//!   + plugin-contributed routes
//!     → aggregator.rs (fixed order)
//!     → auth.rs (resolve `auth` markers against the policy)
//!     → transport
//! ```
//!
//! # Design Decisions
//! - Descriptors are values; every stage returns new ones
//! - Auth is requested per route and resolved in one place
//! - Route modules are declarative files or a registry built in code

pub mod aggregator;
pub mod auth;
pub mod descriptor;
pub mod discovery;

pub use aggregator::{RouteAggregator, STATIC_PATH};
pub use auth::{append_auth, AuthPolicy};
pub use descriptor::{handler_fn, DirectoryHandler, Handler, HandlerFn, RouteDescriptor, RouteOptions, ViewHandler};
pub use discovery::{FileRouteModules, RouteModules, StaticRouteModules};
