//! Plugin registration pipeline.
//!
//! # Data Flow
//! ```text
//! auth module source (once per server)
//!     → instantiate, adopt default scheme
//! descriptors
//!     → normalizer.rs (records, contributed routes, hooks)
//!     → transport.register(records)      one bulk call
//!     → hooks, one at a time, in order
//!     → PluginRegistration (names + contributed routes)
//! ```
//!
//! # Design Decisions
//! - A failed bulk registration runs no hooks
//! - A failed or timed-out hook stops the pass
//! - Hooks get the transport mutably; none run concurrently

use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{PluginError, ServerError};
use crate::http::HttpTransport;
use crate::observability::Logger;
use crate::plugins::catalog::AuthModuleSource;
use crate::plugins::descriptor::PluginDescriptor;
use crate::plugins::normalizer::normalize;
use crate::routing::{AuthPolicy, RouteDescriptor};

/// Outcome of one registration pass.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistration {
    /// Names of the plugins registered in this pass, in order.
    pub plugins: Vec<String>,

    /// Routes contributed by the descriptors of this pass.
    pub routes: Vec<RouteDescriptor>,
}

/// Drives one registration pass against a transport.
pub struct PluginPipeline<'a> {
    transport: &'a mut HttpTransport,
    config: &'a ServerConfig,
    logger: &'a dyn Logger,
    hook_timeout: Option<Duration>,
}

impl<'a> PluginPipeline<'a> {
    pub fn new(transport: &'a mut HttpTransport, config: &'a ServerConfig, logger: &'a dyn Logger) -> Self {
        Self {
            transport,
            config,
            logger,
            hook_timeout: config.post_register_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Override the per-hook time limit.
    pub fn hook_timeout(mut self, limit: Option<Duration>) -> Self {
        self.hook_timeout = limit;
        self
    }

    /// Instantiate the auth module and return its descriptor.
    ///
    /// The module's default scheme is adopted when `policy` has none.
    pub async fn resolve_auth_module(
        &self,
        name: &str,
        source: &AuthModuleSource,
        policy: &mut Option<AuthPolicy>,
    ) -> Result<PluginDescriptor, ServerError> {
        let module = match source {
            AuthModuleSource::Ready(module) => module.clone(),
            AuthModuleSource::Factory(factory) => factory
                .create(&*self.transport, self.config)
                .await
                .map_err(|error| ServerError::AuthModule {
                    name: name.to_string(),
                    reason: error.to_string(),
                })?,
        };

        if let (Some(scheme), Some(policy)) = (module.default_scheme.as_deref(), policy.as_mut()) {
            if policy.adopt_default(scheme) {
                tracing::debug!(module = %name, scheme = %scheme, "Adopted auth module default scheme");
            }
        }

        Ok(module.descriptor)
    }

    /// Normalize, register and run hooks for `descriptors`.
    pub async fn run(mut self, descriptors: Vec<PluginDescriptor>) -> Result<PluginRegistration, PluginError> {
        let info = match normalize(descriptors, &*self.transport, self.config).await {
            Ok(info) => info,
            Err(error) => {
                self.logger.error("Error registering plugins:", "", &error);
                return Err(error);
            }
        };

        let names: Vec<String> = info
            .plugins
            .iter()
            .map(|record| record.plugin.name().to_string())
            .collect();

        if let Err(error) = self.transport.register(info.plugins).await {
            self.logger.error("Error registering plugins:", &names.join(", "), &error);
            return Err(error);
        }

        for (index, hook) in info.post_registration.iter().enumerate() {
            let run = hook.run(&mut *self.transport, self.config);
            let result = match self.hook_timeout {
                Some(limit) => tokio::time::timeout(limit, run)
                    .await
                    .unwrap_or_else(|_| Err(PluginError::HookTimeout(limit))),
                None => run.await,
            };

            if let Err(error) = result {
                self.logger
                    .error("Error running post-registration hook:", &index.to_string(), &error);
                return Err(error);
            }
            tracing::debug!(hook = index, "Post-registration hook completed");
        }

        tracing::info!(
            plugins = names.len(),
            routes = info.routes.len(),
            hooks = info.post_registration.len(),
            "Plugins registered"
        );

        Ok(PluginRegistration {
            plugins: names,
            routes: info.routes,
        })
    }
}
