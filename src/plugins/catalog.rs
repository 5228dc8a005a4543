//! Named plugin and auth module sources.
//!
//! Config refers to plugins and auth modules by name. The catalog maps those
//! names to descriptors when the server is built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::error::PluginError;
use crate::http::HttpTransport;
use crate::plugins::builtin;
use crate::plugins::descriptor::PluginDescriptor;

/// An instantiated auth module.
#[derive(Debug, Clone)]
pub struct AuthModule {
    /// Scheme adopted when the config names none.
    pub default_scheme: Option<String>,

    /// Registered with the base plugins.
    pub descriptor: PluginDescriptor,
}

/// Builds an auth module from the transport and config.
#[async_trait]
pub trait AuthModuleFactory: Send + Sync {
    async fn create(&self, server: &HttpTransport, config: &ServerConfig) -> Result<AuthModule, PluginError>;
}

/// How a catalog entry produces its auth module.
#[derive(Clone)]
pub enum AuthModuleSource {
    Ready(AuthModule),
    Factory(Arc<dyn AuthModuleFactory>),
}

impl fmt::Debug for AuthModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthModuleSource::Ready(module) => f.debug_tuple("Ready").field(module).finish(),
            AuthModuleSource::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Plugins and auth modules addressable by name.
#[derive(Debug, Clone)]
pub struct Catalog {
    plugins: HashMap<String, PluginDescriptor>,
    auth_modules: HashMap<String, AuthModuleSource>,
}

impl Default for Catalog {
    /// Catalog holding the built-in `bearer` auth module.
    fn default() -> Self {
        Self::empty().with_auth_module(builtin::BEARER, builtin::bearer_module())
    }
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            plugins: HashMap::new(),
            auth_modules: HashMap::new(),
        }
    }

    pub fn with_plugin(mut self, name: impl Into<String>, descriptor: PluginDescriptor) -> Self {
        self.plugins.insert(name.into(), descriptor);
        self
    }

    pub fn with_auth_module(mut self, name: impl Into<String>, source: AuthModuleSource) -> Self {
        self.auth_modules.insert(name.into(), source);
        self
    }

    pub fn plugin(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(name)
    }

    pub fn auth_module(&self, name: &str) -> Option<&AuthModuleSource> {
        self.auth_modules.get(name)
    }
}
