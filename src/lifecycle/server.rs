//! Server lifecycle.
//!
//! # Responsibilities
//! - Resolve configured plugin and auth module names through the catalog
//! - Create the transport on `init`
//! - Register plugins, then routes, then listen, in that order
//!
//! # Design Decisions
//! - Route registration starts only after every plugin and hook completed
//! - A failed `init` leaves the server in `Initializing`; it is not retried
//! - The auth module is instantiated once and reused on later passes

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::{PluginError, ServerError};
use crate::http::{HttpTransport, ServerInfo};
use crate::observability::{Logger, TracingLogger};
use crate::plugins::{
    AuthModuleSource, Catalog, PluginDescriptor, PluginPipeline, PluginRegistration, PluginUnit, StaticFiles, Views,
};
use crate::routing::{append_auth, AuthPolicy, FileRouteModules, RouteAggregator, RouteDescriptor, RouteModules};

/// Where a [`Server`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    Listening,
}

/// Collects everything a [`Server`] is built from.
pub struct ServerBuilder {
    config: ServerConfig,
    catalog: Catalog,
    plugins: Vec<PluginDescriptor>,
    routes: Vec<RouteDescriptor>,
    route_modules: Arc<dyn RouteModules>,
    logger: Arc<dyn Logger>,
}

impl ServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            catalog: Catalog::default(),
            plugins: Vec::new(),
            routes: Vec::new(),
            route_modules: Arc::new(FileRouteModules),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Catalog config names are resolved against.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Register `descriptor` after the plugins named in config.
    pub fn plugin(mut self, descriptor: PluginDescriptor) -> Self {
        self.plugins.push(descriptor);
        self
    }

    /// Add a default route after the ones from config.
    pub fn route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(route);
        self
    }

    pub fn route_modules(mut self, modules: impl RouteModules + 'static) -> Self {
        self.route_modules = Arc::new(modules);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Resolve catalog names and build the server.
    pub fn build(self) -> Result<Server, ServerError> {
        let mut configured = Vec::with_capacity(self.config.plugins.len() + self.plugins.len());
        for name in &self.config.plugins {
            let descriptor = self
                .catalog
                .plugin(name)
                .cloned()
                .ok_or_else(|| PluginError::Unknown(name.clone()))?;
            configured.push(descriptor);
        }
        configured.extend(self.plugins);

        let auth_module = match self.config.auth.as_ref().and_then(|auth| auth.module.as_ref()) {
            Some(name) => {
                let source = self
                    .catalog
                    .auth_module(name)
                    .cloned()
                    .ok_or_else(|| ServerError::AuthModule {
                        name: name.clone(),
                        reason: "not in the catalog".to_string(),
                    })?;
                Some((name.clone(), source))
            }
            None => None,
        };

        let policy = self.config.auth.as_ref().map(AuthPolicy::from_config);
        let mut default_routes = self.config.routes.clone();
        default_routes.extend(self.routes);

        Ok(Server {
            config: self.config,
            logger: self.logger,
            route_modules: self.route_modules,
            configured,
            default_routes,
            auth_module,
            auth_descriptor: None,
            policy,
            transport: None,
            state: LifecycleState::Uninitialized,
        })
    }
}

/// Composes plugins and routes onto an [`HttpTransport`] and serves them.
pub struct Server {
    config: ServerConfig,
    logger: Arc<dyn Logger>,
    route_modules: Arc<dyn RouteModules>,
    configured: Vec<PluginDescriptor>,
    default_routes: Vec<RouteDescriptor>,
    auth_module: Option<(String, AuthModuleSource)>,
    auth_descriptor: Option<PluginDescriptor>,
    policy: Option<AuthPolicy>,
    transport: Option<HttpTransport>,
    state: LifecycleState,
}

impl Server {
    pub fn builder(config: ServerConfig) -> ServerBuilder {
        ServerBuilder::new(config)
    }

    /// Create the transport, register plugins, then register routes.
    pub async fn init(&mut self) -> Result<(), ServerError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(ServerError::AlreadyInitialized);
        }
        self.state = LifecycleState::Initializing;

        let mut transport = HttpTransport::new(self.config.resolved_web_root());
        transport.connection(self.config.connection.clone());
        self.transport = Some(transport);

        let registration = self.register_plugins(Vec::new()).await?;
        self.register_routes(Vec::new(), &registration)?;

        self.state = LifecycleState::Ready;
        tracing::info!(plugins = registration.plugins.len(), "Server initialized");
        Ok(())
    }

    /// Listen on the configured address, initializing first if needed.
    pub async fn start(&mut self) -> Result<&Self, ServerError> {
        match self.state {
            LifecycleState::Uninitialized => {
                self.init().await?;
                Box::pin(self.start()).await
            }
            LifecycleState::Initializing => Err(ServerError::NotReady),
            LifecycleState::Listening => Err(ServerError::AlreadyListening),
            LifecycleState::Ready => {
                let transport = self.transport.as_mut().ok_or(ServerError::NotInitialized)?;
                let info = transport.start().await?;

                self.logger.info(
                    "Serving static content from:",
                    &transport.web_root().display().to_string(),
                );
                self.logger.info("Server running at:", &info.uri);
                self.state = LifecycleState::Listening;
                Ok(self)
            }
        }
    }

    /// Register the base, configured and `extra` plugins in one pass.
    ///
    /// The base plugins are registered on every call, so a second pass on the
    /// same transport fails with [`PluginError::Duplicate`].
    pub async fn register_plugins(&mut self, extra: Vec<PluginDescriptor>) -> Result<PluginRegistration, ServerError> {
        let transport = self.transport.as_mut().ok_or(ServerError::NotInitialized)?;
        let pipeline = PluginPipeline::new(transport, &self.config, self.logger.as_ref());

        if self.auth_descriptor.is_none() {
            if let Some((name, source)) = &self.auth_module {
                let descriptor = pipeline.resolve_auth_module(name, source, &mut self.policy).await?;
                self.auth_descriptor = Some(descriptor);
            }
        }

        let mut descriptors = vec![
            PluginDescriptor::plugin(PluginUnit::new(StaticFiles)),
            PluginDescriptor::plugin(PluginUnit::new(Views)),
        ];
        descriptors.extend(self.auth_descriptor.clone());
        descriptors.extend(self.configured.iter().cloned());
        descriptors.extend(extra);

        Ok(pipeline.run(descriptors).await?)
    }

    /// Mount every route source plus `extra` and the routes `registration` contributed.
    pub fn register_routes(
        &mut self,
        extra: Vec<RouteDescriptor>,
        registration: &PluginRegistration,
    ) -> Result<Vec<RouteDescriptor>, ServerError> {
        let transport = self.transport.as_mut().ok_or(ServerError::NotInitialized)?;
        let aggregator = RouteAggregator::new(self.config.resolved_routes_path(), self.route_modules.clone())
            .serve_static(self.config.serve_static)
            .default_routes(self.default_routes.clone());

        Ok(aggregator.register(
            transport,
            self.policy.as_ref(),
            extra,
            &registration.routes,
            self.logger.as_ref(),
        )?)
    }

    /// Resolve auth markers on `routes` against this server's policy.
    pub fn append_auth(&self, routes: &[RouteDescriptor]) -> Vec<RouteDescriptor> {
        append_auth(self.policy.as_ref(), routes)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The transport, once `init` created it.
    pub fn transport(&self) -> Option<&HttpTransport> {
        self.transport.as_ref()
    }

    /// Bound address, once listening.
    pub fn info(&self) -> Option<&ServerInfo> {
        self.transport.as_ref().and_then(HttpTransport::info)
    }

    pub fn web_root(&self) -> PathBuf {
        self.config.resolved_web_root()
    }

    /// Effective auth policy, including a default scheme adopted from the auth module.
    pub fn auth_policy(&self) -> Option<&AuthPolicy> {
        self.policy.as_ref()
    }
}
