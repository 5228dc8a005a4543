//! Service host library.
//!
//! Composes an HTTP service from plugins and declarative routes: plugins are
//! registered first, their post-registration hooks run in order, and only then
//! is the route table assembled, auth-annotated and mounted.

// Core subsystems
pub mod config;
pub mod http;
pub mod plugins;
pub mod routing;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use error::{PluginError, RouteError, RouteModuleError, ServerError, TransportError};
pub use http::HttpTransport;
pub use lifecycle::{LifecycleState, Server, ServerBuilder};
pub use plugins::{Catalog, PluginDescriptor, PluginRegistration, PluginUnit};
pub use routing::{Handler, RouteDescriptor};
