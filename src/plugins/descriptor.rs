//! Plugin descriptors.
//!
//! Everything that can be handed to the registration pipeline is a
//! [`PluginDescriptor`]. The normalizer turns a list of them into transport
//! records, contributed routes and post-registration hooks.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ServerConfig;
use crate::error::PluginError;
use crate::http::HttpTransport;
use crate::routing::RouteDescriptor;

/// A unit of functionality registered on the transport.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique name. Registering two plugins with the same name fails.
    fn name(&self) -> &str;

    async fn register(&self, server: &mut HttpTransport, options: &Value) -> Result<(), PluginError>;
}

/// Runs after bulk registration succeeded. Returning is the completion signal.
#[async_trait]
pub trait PostRegister: Send + Sync {
    async fn run(&self, server: &mut HttpTransport, config: &ServerConfig) -> Result<(), PluginError>;
}

/// Produces a descriptor from the transport and config.
#[async_trait]
pub trait DescriptorFactory: Send + Sync {
    async fn build(&self, server: &HttpTransport, config: &ServerConfig) -> Result<PluginDescriptor, PluginError>;
}

#[async_trait]
impl<F> DescriptorFactory for F
where
    F: Fn(&HttpTransport, &ServerConfig) -> PluginDescriptor + Send + Sync,
{
    async fn build(&self, server: &HttpTransport, config: &ServerConfig) -> Result<PluginDescriptor, PluginError> {
        Ok(self(server, config))
    }
}

/// Computes contributed routes from the transport and config.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn routes(&self, server: &HttpTransport, config: &ServerConfig) -> Result<Vec<RouteDescriptor>, PluginError>;
}

#[async_trait]
impl<F> RouteProvider for F
where
    F: Fn(&HttpTransport, &ServerConfig) -> Vec<RouteDescriptor> + Send + Sync,
{
    async fn routes(&self, server: &HttpTransport, config: &ServerConfig) -> Result<Vec<RouteDescriptor>, PluginError> {
        Ok(self(server, config))
    }
}

/// Routes a descriptor contributes.
#[derive(Clone)]
pub enum RoutesProvider {
    Literal(Vec<RouteDescriptor>),
    Computed(Arc<dyn RouteProvider>),
}

impl From<Vec<RouteDescriptor>> for RoutesProvider {
    fn from(routes: Vec<RouteDescriptor>) -> Self {
        RoutesProvider::Literal(routes)
    }
}

impl From<RouteDescriptor> for RoutesProvider {
    fn from(route: RouteDescriptor) -> Self {
        RoutesProvider::Literal(vec![route])
    }
}

/// A plugin with its registration options and optional hook.
#[derive(Clone)]
pub struct PluginUnit {
    pub plugin: Arc<dyn Plugin>,
    pub options: Option<Value>,
    pub post_register: Option<Arc<dyn PostRegister>>,
}

impl PluginUnit {
    pub fn new(plugin: impl Plugin + 'static) -> Self {
        Self::from_arc(Arc::new(plugin))
    }

    pub fn from_arc(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            plugin,
            options: None,
            post_register: None,
        }
    }

    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn post_register(mut self, hook: impl PostRegister + 'static) -> Self {
        self.post_register = Some(Arc::new(hook));
        self
    }

    /// Transport-shaped record for this unit.
    pub fn record(&self) -> PluginRecord {
        PluginRecord {
            plugin: self.plugin.clone(),
            options: self.options.clone().unwrap_or(Value::Null),
        }
    }
}

/// What the transport registers.
#[derive(Clone)]
pub struct PluginRecord {
    pub plugin: Arc<dyn Plugin>,
    pub options: Value,
}

impl PluginRecord {
    pub fn new(plugin: impl Plugin + 'static, options: Value) -> Self {
        Self {
            plugin: Arc::new(plugin),
            options,
        }
    }
}

/// Every shape a plugin source can take.
#[derive(Clone)]
pub enum PluginDescriptor {
    /// Built lazily from the transport and config.
    Factory(Arc<dyn DescriptorFactory>),

    /// Only contributes routes.
    Routes(RoutesProvider),

    /// One plugin, optionally contributing routes.
    Plugin {
        unit: PluginUnit,
        routes: Option<RoutesProvider>,
    },

    /// Several plugins registered together, optionally contributing routes.
    Group {
        units: Vec<PluginUnit>,
        routes: Option<RoutesProvider>,
    },

    /// Already normalized; passed to the transport as is.
    Record(PluginRecord),
}

impl PluginDescriptor {
    pub fn factory(factory: impl DescriptorFactory + 'static) -> Self {
        PluginDescriptor::Factory(Arc::new(factory))
    }

    pub fn routes(routes: impl Into<RoutesProvider>) -> Self {
        PluginDescriptor::Routes(routes.into())
    }

    pub fn computed_routes(provider: impl RouteProvider + 'static) -> Self {
        PluginDescriptor::Routes(RoutesProvider::Computed(Arc::new(provider)))
    }

    pub fn plugin(unit: PluginUnit) -> Self {
        PluginDescriptor::Plugin { unit, routes: None }
    }

    pub fn group(units: Vec<PluginUnit>) -> Self {
        PluginDescriptor::Group { units, routes: None }
    }

    /// Attach contributed routes to a `Plugin` or `Group` descriptor.
    /// Other variants are returned unchanged.
    pub fn with_routes(self, provided: impl Into<RoutesProvider>) -> Self {
        match self {
            PluginDescriptor::Plugin { unit, .. } => PluginDescriptor::Plugin {
                unit,
                routes: Some(provided.into()),
            },
            PluginDescriptor::Group { units, .. } => PluginDescriptor::Group {
                units,
                routes: Some(provided.into()),
            },
            other => other,
        }
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginDescriptor::Factory(_) => f.write_str("Factory(..)"),
            PluginDescriptor::Routes(_) => f.write_str("Routes(..)"),
            PluginDescriptor::Plugin { unit, .. } => {
                f.debug_tuple("Plugin").field(&unit.plugin.name()).finish()
            }
            PluginDescriptor::Group { units, .. } => f
                .debug_tuple("Group")
                .field(&units.iter().map(|u| u.plugin.name()).collect::<Vec<_>>())
                .finish(),
            PluginDescriptor::Record(record) => {
                f.debug_tuple("Record").field(&record.plugin.name()).finish()
            }
        }
    }
}
