//! Error types shared across subsystems.
//!
//! # Propagation
//! ```text
//! RouteModuleError  → logged by the aggregator, module dropped
//! PluginError       → aborts the registration pass, routes never registered
//! RouteError        → aborts route registration
//! TransportError    → returned from start()
//! ServerError       → what the lifecycle entry points return
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Failure while loading a route module.
#[derive(Debug, thiserror::Error)]
pub enum RouteModuleError {
    #[error("failed to read route module {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse route module {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("route module {0} is not registered")]
    NotFound(PathBuf),

    #[error("route module {path} is invalid: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Failure while normalizing or registering plugins.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin `{name}` failed to register: {reason}")]
    Registration { name: String, reason: String },

    #[error("plugin `{0}` is already registered")]
    Duplicate(String),

    #[error("no plugin named `{0}` in the catalog")]
    Unknown(String),

    #[error("plugin factory failed: {0}")]
    Factory(String),

    #[error("plugin factories nested deeper than {0} levels")]
    FactoryDepth(usize),

    #[error("route provider failed: {0}")]
    Provider(String),

    #[error("post-registration hook failed: {0}")]
    Hook(String),

    #[error("post-registration hook did not complete within {0:?}")]
    HookTimeout(Duration),
}

/// Failure while mounting routes on the transport.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route {method} {path} has no handler")]
    MissingHandler { method: String, path: String },

    #[error("route {path} uses unsupported method `{method}`")]
    InvalidMethod { method: String, path: String },

    #[error("route path `{0}` is malformed")]
    InvalidPath(String),

    #[error("route {method} {path} conflicts with an existing route")]
    Conflict { method: String, path: String },

    #[error("route {path} requires unknown auth scheme `{scheme}`")]
    UnknownScheme { scheme: String, path: String },

    #[error("route {path} references unknown handler `{name}`")]
    UnknownHandler { name: String, path: String },

    #[error("route {path} needs the `{capability}` capability; register its plugin first")]
    MissingCapability {
        capability: &'static str,
        path: String,
    },
}

/// Failure of the transport itself.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport is already listening")]
    AlreadyStarted,

    #[error("auth scheme `{0}` is already registered")]
    DuplicateScheme(String),
}

/// Error returned by the server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("auth module `{name}` could not be loaded: {reason}")]
    AuthModule { name: String, reason: String },

    #[error("server has not been initialized")]
    NotInitialized,

    #[error("server is already initialized")]
    AlreadyInitialized,

    #[error("server initialization did not complete")]
    NotReady,

    #[error("server is already listening")]
    AlreadyListening,
}
