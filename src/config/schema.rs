//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::routing::RouteDescriptor;

/// Root configuration for the service host.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings (host, port).
    pub connection: ConnectionConfig,

    /// Auth settings. Presence enables the auth policy.
    pub auth: Option<AuthConfig>,

    /// Catalog names of plugins to register after the built-ins.
    pub plugins: Vec<String>,

    /// Default routes registered on every server.
    pub routes: Vec<RouteDescriptor>,

    /// Directory static files and views are served from.
    #[serde(alias = "webroot", alias = "webRoot")]
    pub web_root: PathBuf,

    /// Directory holding route modules.
    pub routes_path: PathBuf,

    /// Serve the web root under a catch-all route.
    #[serde(rename = "static")]
    pub serve_static: bool,

    /// Upper bound for each post-registration hook. Unset means no limit.
    pub post_register_timeout_secs: Option<u64>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            auth: None,
            plugins: Vec::new(),
            routes: Vec::new(),
            web_root: PathBuf::from("ui/build"),
            routes_path: PathBuf::from("routes"),
            serve_static: true,
            post_register_timeout_secs: None,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Web root resolved against the working directory.
    pub fn resolved_web_root(&self) -> PathBuf {
        resolve(&self.web_root)
    }

    /// Routes directory resolved against the working directory.
    pub fn resolved_routes_path(&self) -> PathBuf {
        resolve(&self.routes_path)
    }
}

fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to bind. `0` picks a free port.
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
        }
    }
}

impl ConnectionConfig {
    /// `host:port` string handed to the listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Auth configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Scheme applied to routes that request auth.
    #[serde(alias = "type")]
    pub scheme: Option<String>,

    /// Catalog name of the auth module to register.
    pub module: Option<String>,

    /// Require auth for the static-files route.
    #[serde(rename = "static")]
    pub static_files: bool,

    /// Free-form settings read by the auth module.
    pub options: serde_json::Value,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
