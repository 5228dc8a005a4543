//! Plugin descriptor normalization.
//!
//! # Responsibilities
//! - Resolve factories against the transport and config
//! - Collect routes contributed by providers
//! - Flatten plugins and groups into transport records
//! - Collect post-registration hooks in declaration order
//!
//! # Design Decisions
//! - One pass, input order preserved across and within descriptors
//! - Routes and plugins on the same descriptor are both honored
//! - Factory chains are bounded so a self-returning factory cannot spin forever

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::PluginError;
use crate::http::HttpTransport;
use crate::plugins::descriptor::{PluginDescriptor, PluginRecord, PluginUnit, PostRegister, RoutesProvider};
use crate::routing::RouteDescriptor;

/// Deepest factory chain followed before giving up.
pub const MAX_FACTORY_DEPTH: usize = 16;

/// Result of normalizing one list of descriptors.
#[derive(Default)]
pub struct PluginRegistrationInfo {
    pub plugins: Vec<PluginRecord>,
    pub routes: Vec<RouteDescriptor>,
    pub post_registration: Vec<Arc<dyn PostRegister>>,
}

impl PluginRegistrationInfo {
    fn push_unit(&mut self, unit: &PluginUnit) {
        self.plugins.push(unit.record());
        if let Some(hook) = &unit.post_register {
            self.post_registration.push(hook.clone());
        }
    }

    async fn push_routes(
        &mut self,
        provider: &RoutesProvider,
        server: &HttpTransport,
        config: &ServerConfig,
    ) -> Result<(), PluginError> {
        match provider {
            RoutesProvider::Literal(routes) => self.routes.extend(routes.iter().cloned()),
            RoutesProvider::Computed(provider) => self.routes.extend(provider.routes(server, config).await?),
        }
        Ok(())
    }
}

/// Normalize `descriptors` in order.
pub async fn normalize(
    descriptors: Vec<PluginDescriptor>,
    server: &HttpTransport,
    config: &ServerConfig,
) -> Result<PluginRegistrationInfo, PluginError> {
    let mut info = PluginRegistrationInfo::default();

    for descriptor in descriptors {
        let descriptor = resolve(descriptor, server, config).await?;
        match descriptor {
            PluginDescriptor::Factory(_) => return Err(PluginError::FactoryDepth(MAX_FACTORY_DEPTH)),
            PluginDescriptor::Routes(provider) => {
                info.push_routes(&provider, server, config).await?;
            }
            PluginDescriptor::Plugin { unit, routes } => {
                if let Some(provider) = &routes {
                    info.push_routes(provider, server, config).await?;
                }
                info.push_unit(&unit);
            }
            PluginDescriptor::Group { units, routes } => {
                if let Some(provider) = &routes {
                    info.push_routes(provider, server, config).await?;
                }
                for unit in &units {
                    info.push_unit(unit);
                }
            }
            PluginDescriptor::Record(record) => info.plugins.push(record),
        }
    }

    tracing::debug!(
        plugins = info.plugins.len(),
        routes = info.routes.len(),
        hooks = info.post_registration.len(),
        "Plugins normalized"
    );
    Ok(info)
}

/// Follow factories up to [`MAX_FACTORY_DEPTH`] levels. Still a factory after that.
async fn resolve(
    mut descriptor: PluginDescriptor,
    server: &HttpTransport,
    config: &ServerConfig,
) -> Result<PluginDescriptor, PluginError> {
    for _ in 0..MAX_FACTORY_DEPTH {
        match descriptor {
            PluginDescriptor::Factory(factory) => descriptor = factory.build(server, config).await?,
            concrete => return Ok(concrete),
        }
    }
    Ok(descriptor)
}
