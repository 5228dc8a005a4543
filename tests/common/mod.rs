//! Shared utilities for integration tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use service_host::config::ServerConfig;
use service_host::plugins::{Plugin, PostRegister};
use service_host::{HttpTransport, PluginError};

/// Ordered record of what plugins and hooks observed.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Config bound to a free local port, serving `web_root`.
pub fn local_config(web_root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.connection.host = "127.0.0.1".into();
    config.connection.port = 0;
    config.web_root = web_root.to_path_buf();
    config.routes_path = web_root.join("routes");
    config
}

/// Plugin that records its registration and optionally fails.
pub struct TracedPlugin {
    pub name: &'static str,
    pub trace: Trace,
    pub fail: bool,
}

#[async_trait]
impl Plugin for TracedPlugin {
    fn name(&self) -> &str {
        self.name
    }

    async fn register(&self, _server: &mut HttpTransport, _options: &Value) -> Result<(), PluginError> {
        self.trace.push(format!("register:{}", self.name));
        if self.fail {
            return Err(PluginError::Registration {
                name: self.name.to_string(),
                reason: "refused".into(),
            });
        }
        Ok(())
    }
}

/// Hook that records how many routes were mounted when it ran.
pub struct RouteCountHook {
    pub trace: Trace,
}

#[async_trait]
impl PostRegister for RouteCountHook {
    async fn run(&self, server: &mut HttpTransport, _config: &ServerConfig) -> Result<(), PluginError> {
        self.trace.push(format!("hook:routes={}", server.routes().len()));
        Ok(())
    }
}
