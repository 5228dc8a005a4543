//! Route aggregation.
//!
//! # Data Flow
//! ```text
//! static-files route (when enabled)
//!   + default routes (config, builder)
//!   + call-time routes
//!   + discovered routes (discovery.rs)
//!   + plugin-contributed routes
//!     → auth.rs append_auth
//!     → transport.route(all)      one bulk call
//! ```
//!
//! # Design Decisions
//! - Order is fixed and independent of the sources' contents
//! - Conflicting routes fail the whole bulk call in the transport
//! - A broken route module is logged and skipped, never fatal

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RouteError;
use crate::http::HttpTransport;
use crate::observability::Logger;
use crate::routing::auth::{append_auth, AuthPolicy};
use crate::routing::descriptor::{DirectoryHandler, Handler, RouteDescriptor};
use crate::routing::discovery::RouteModules;

/// Path of the static-files route.
pub const STATIC_PATH: &str = "/{*path}";

/// Assembles the route table from every source.
#[derive(Clone)]
pub struct RouteAggregator {
    serve_static: bool,
    default_routes: Vec<RouteDescriptor>,
    routes_path: PathBuf,
    modules: Arc<dyn RouteModules>,
}

impl RouteAggregator {
    pub fn new(routes_path: impl Into<PathBuf>, modules: Arc<dyn RouteModules>) -> Self {
        Self {
            serve_static: true,
            default_routes: Vec::new(),
            routes_path: routes_path.into(),
            modules,
        }
    }

    pub fn serve_static(mut self, enabled: bool) -> Self {
        self.serve_static = enabled;
        self
    }

    pub fn default_routes(mut self, routes: Vec<RouteDescriptor>) -> Self {
        self.default_routes = routes;
        self
    }

    /// Catch-all route serving the web root.
    pub fn static_route(policy: Option<&AuthPolicy>) -> RouteDescriptor {
        RouteDescriptor::get(
            STATIC_PATH,
            Handler::Directory(DirectoryHandler {
                path: PathBuf::from("."),
                redirect_to_slash: true,
                index: true,
            }),
        )
        .with_auth(policy.is_some_and(|p| p.protect_static))
    }

    /// Routes from the routes directory.
    ///
    /// The top-level index wins; without one, every `*/index` is loaded in
    /// directory order and failures are logged and dropped.
    pub fn discover(&self, logger: &dyn Logger) -> Vec<RouteDescriptor> {
        match self.modules.load(&self.routes_path, None) {
            Ok(routes) => routes,
            Err(error) => {
                tracing::debug!(path = %self.routes_path.display(), error = %error, "No top-level route index");
                let mut routes = Vec::new();
                for name in self.modules.discover(&self.routes_path) {
                    match self.modules.load(&self.routes_path, Some(&name)) {
                        Ok(found) => routes.extend(found),
                        Err(error) => {
                            let module = self.routes_path.join(&name).join("index");
                            logger.error("Error loading route:", &module.display().to_string(), &error);
                        }
                    }
                }
                routes
            }
        }
    }

    /// Every route in registration order, before auth injection.
    pub fn assemble(
        &self,
        policy: Option<&AuthPolicy>,
        extra: Vec<RouteDescriptor>,
        plugin_routes: &[RouteDescriptor],
        logger: &dyn Logger,
    ) -> Vec<RouteDescriptor> {
        let mut routes = Vec::new();
        if self.serve_static {
            routes.push(Self::static_route(policy));
        }
        routes.extend(self.default_routes.iter().cloned());
        routes.extend(extra);
        routes.extend(self.discover(logger));
        routes.extend(plugin_routes.iter().cloned());
        routes
    }

    /// Assemble, inject auth and mount everything on `transport`.
    pub fn register(
        &self,
        transport: &mut HttpTransport,
        policy: Option<&AuthPolicy>,
        extra: Vec<RouteDescriptor>,
        plugin_routes: &[RouteDescriptor],
        logger: &dyn Logger,
    ) -> Result<Vec<RouteDescriptor>, RouteError> {
        let routes = append_auth(policy, &self.assemble(policy, extra, plugin_routes, logger));

        for route in &routes {
            let message = if policy.is_some() && route.auth_scheme().is_some() {
                format!("Registering authenticated {}:", route.method)
            } else {
                format!("Registering {}:", route.method)
            };
            logger.info(&message, &route.path);
        }

        transport.route(routes.clone())?;
        tracing::info!(routes = routes.len(), "Routes registered");
        Ok(routes)
    }
}
