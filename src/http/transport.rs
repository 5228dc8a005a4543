//! Axum-backed transport.
//!
//! # Responsibilities
//! - Hold the listener settings and web root
//! - Register plugins in order and expose the capabilities they add
//!   (file serving, views, auth schemes, named handlers)
//! - Mount route descriptors on an Axum router
//! - Bind the listener and serve
//!
//! # Design Decisions
//! - A bulk `route` call mounts all of its routes or none of them
//! - Conflicts are rejected before Axum sees them
//! - Serving runs on a spawned task over a clone of the router

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{any, any_service, on, on_service, MethodFilter, MethodRouter},
    Router,
};
use tera::Tera;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::Service;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::ConnectionConfig;
use crate::error::{PluginError, RouteError, TransportError};
use crate::http::auth::{require_auth, AuthScheme};
use crate::http::request::with_request_tracing;
use crate::plugins::PluginRecord;
use crate::routing::descriptor::{Handler, HandlerFn, RouteDescriptor, ViewHandler};

/// Address the transport is listening on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub address: SocketAddr,
    pub uri: String,
}

/// A route as mounted on the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedRoute {
    pub method: String,
    pub path: String,
    pub auth: Option<String>,
}

/// The HTTP engine plugins and routes are registered on.
pub struct HttpTransport {
    web_root: PathBuf,
    connection: ConnectionConfig,
    router: Router,
    table: Vec<MountedRoute>,
    plugins: Vec<String>,
    schemes: HashMap<String, Arc<dyn AuthScheme>>,
    handlers: HashMap<String, HandlerFn>,
    files: bool,
    views: Option<Arc<Tera>>,
    info: Option<ServerInfo>,
    serve_task: Option<JoinHandle<()>>,
}

impl HttpTransport {
    /// Create a transport serving files relative to `web_root`.
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            web_root: web_root.into(),
            connection: ConnectionConfig::default(),
            router: Router::new(),
            table: Vec::new(),
            plugins: Vec::new(),
            schemes: HashMap::new(),
            handlers: HashMap::new(),
            files: false,
            views: None,
            info: None,
            serve_task: None,
        }
    }

    /// Set the listener settings.
    pub fn connection(&mut self, connection: ConnectionConfig) {
        self.connection = connection;
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    // ---- plugin registration ----

    /// Register plugin records in order. Stops at the first failure.
    pub async fn register(&mut self, records: Vec<PluginRecord>) -> Result<(), PluginError> {
        for record in records {
            let name = record.plugin.name().to_string();
            if self.plugins.contains(&name) {
                return Err(PluginError::Duplicate(name));
            }
            record.plugin.register(self, &record.options).await?;
            tracing::debug!(plugin = %name, "Plugin registered");
            self.plugins.push(name);
        }
        Ok(())
    }

    /// Names of registered plugins, in registration order.
    pub fn registered_plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Allow `directory` and `file` handlers.
    pub fn enable_files(&mut self) {
        self.files = true;
    }

    pub fn files_enabled(&self) -> bool {
        self.files
    }

    /// Install the template engine used by `view` handlers.
    pub fn set_views(&mut self, engine: Tera) {
        self.views = Some(Arc::new(engine));
    }

    pub fn views(&self) -> Option<&Tera> {
        self.views.as_deref()
    }

    /// Register an auth scheme under `name`.
    pub fn auth_scheme(
        &mut self,
        name: impl Into<String>,
        scheme: Arc<dyn AuthScheme>,
    ) -> Result<(), TransportError> {
        let name = name.into();
        if self.schemes.contains_key(&name) {
            return Err(TransportError::DuplicateScheme(name));
        }
        tracing::debug!(scheme = %name, "Auth scheme registered");
        self.schemes.insert(name, scheme);
        Ok(())
    }

    pub fn has_auth_scheme(&self, name: &str) -> bool {
        self.schemes.contains_key(name)
    }

    /// Register a handler that route descriptors can reference by name.
    pub fn handler(&mut self, name: impl Into<String>, handler: HandlerFn) {
        self.handlers.insert(name.into(), handler);
    }

    // ---- routes ----

    /// Mount every route. On error nothing from this call is mounted.
    pub fn route(&mut self, routes: Vec<RouteDescriptor>) -> Result<(), RouteError> {
        let mut router = self.router.clone();
        let mut table = self.table.clone();
        let mut shape = path_shape(&table);
        let mut aliases = Vec::new();

        for route in &routes {
            validate_path(&route.path)?;
            let filter = method_filter(&route.method, &route.path)?;
            let method = normalized_method(&route.method);
            if conflicts(&table, &method, &route.path) {
                return Err(RouteError::Conflict {
                    method,
                    path: route.path.clone(),
                });
            }
            if !table.iter().any(|mounted| mounted.path == route.path) {
                insert_path(&mut shape, &method, &route.path)?;
            }

            let method_router = self.method_router(filter, route)?;
            router = router.route(&route.path, method_router.clone());
            table.push(MountedRoute {
                method: method.clone(),
                path: route.path.clone(),
                auth: route.auth_scheme().map(str::to_string),
            });

            if is_root_catch_all(&route.path) {
                aliases.push((method, method_router, route.auth_scheme().map(str::to_string)));
            }
        }

        // `/{*path}` does not match `/`; serve the root with the same handler unless it is taken.
        for (method, method_router, auth) in aliases {
            if conflicts(&table, &method, "/") {
                continue;
            }
            if !table.iter().any(|mounted| mounted.path == "/") && shape.insert("/", ()).is_err() {
                continue;
            }
            router = router.route("/", method_router);
            table.push(MountedRoute {
                method,
                path: "/".to_string(),
                auth,
            });
        }

        self.router = router;
        self.table = table;
        Ok(())
    }

    /// Routes mounted so far, in mount order.
    pub fn routes(&self) -> &[MountedRoute] {
        &self.table
    }

    fn method_router(
        &self,
        filter: Option<MethodFilter>,
        route: &RouteDescriptor,
    ) -> Result<MethodRouter, RouteError> {
        let handler = route
            .resolved_handler()
            .ok_or_else(|| RouteError::MissingHandler {
                method: route.method.clone(),
                path: route.path.clone(),
            })?;

        let mut method_router = match handler {
            Handler::Function(f) => function_route(filter, f.clone()),
            Handler::Named(name) => {
                let f = self
                    .handlers
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RouteError::UnknownHandler {
                        name: name.clone(),
                        path: route.path.clone(),
                    })?;
                function_route(filter, f)
            }
            Handler::Directory(dir) => {
                self.require_files(&route.path)?;
                // ServeDir couples the trailing-slash redirect to index serving.
                let service = ServeDir::new(self.web_root.join(&dir.path))
                    .append_index_html_on_directories(dir.index || dir.redirect_to_slash);
                service_route(filter, service)
            }
            Handler::File(file) => {
                self.require_files(&route.path)?;
                service_route(filter, ServeFile::new(self.web_root.join(file)))
            }
            Handler::View(view) => {
                let engine = self
                    .views
                    .clone()
                    .ok_or_else(|| RouteError::MissingCapability {
                        capability: "views",
                        path: route.path.clone(),
                    })?;
                let view = view.clone();
                let render = move || {
                    let response = render_view(&engine, &view);
                    async move { response }
                };
                match filter {
                    Some(filter) => on(filter, render),
                    None => any(render),
                }
            }
        };

        if let Some(scheme_name) = route.auth_scheme() {
            let scheme = self
                .schemes
                .get(scheme_name)
                .cloned()
                .ok_or_else(|| RouteError::UnknownScheme {
                    scheme: scheme_name.to_string(),
                    path: route.path.clone(),
                })?;
            method_router = method_router.layer(middleware::from_fn_with_state(scheme, require_auth));
        }

        Ok(method_router)
    }

    fn require_files(&self, path: &str) -> Result<(), RouteError> {
        if self.files {
            Ok(())
        } else {
            Err(RouteError::MissingCapability {
                capability: "files",
                path: path.to_string(),
            })
        }
    }

    // ---- serving ----

    /// Router with the request tracing layers applied.
    pub fn app(&self) -> Router {
        with_request_tracing(self.router.clone())
    }

    /// Bind the configured address and start serving.
    pub async fn start(&mut self) -> Result<ServerInfo, TransportError> {
        if self.info.is_some() {
            return Err(TransportError::AlreadyStarted);
        }

        let address = self.connection.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| TransportError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { address, source })?;

        let app = self.app();
        self.serve_task = Some(tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!(error = %error, "HTTP server stopped");
            }
        }));

        tracing::info!(address = %local_addr, routes = self.table.len(), "HTTP server listening");

        let info = ServerInfo {
            address: local_addr,
            uri: format!("http://{}", local_addr),
        };
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Bound address, once started.
    pub fn info(&self) -> Option<&ServerInfo> {
        self.info.as_ref()
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.serve_task.take() {
            task.abort();
        }
    }
}

fn function_route(filter: Option<MethodFilter>, f: HandlerFn) -> MethodRouter {
    let handler = move |request: Request<Body>| f(request);
    match filter {
        Some(filter) => on(filter, handler),
        None => any(handler),
    }
}

fn service_route<T>(filter: Option<MethodFilter>, service: T) -> MethodRouter
where
    T: Service<Request<Body>, Error = Infallible> + Clone + Send + Sync + 'static,
    T::Response: IntoResponse + 'static,
    T::Future: Send + 'static,
{
    match filter {
        Some(filter) => on_service(filter, service),
        None => any_service(service),
    }
}

fn render_view(engine: &Tera, view: &ViewHandler) -> Response {
    let context = if view.context.is_null() {
        Ok(tera::Context::new())
    } else {
        tera::Context::from_value(view.context.clone())
    };

    match context.and_then(|context| engine.render(&view.template, &context)) {
        Ok(html) => Html(html).into_response(),
        Err(error) => {
            tracing::error!(template = %view.template, error = %error, "Failed to render view");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn normalized_method(method: &str) -> String {
    method.to_ascii_uppercase()
}

fn method_filter(method: &str, path: &str) -> Result<Option<MethodFilter>, RouteError> {
    if method == "*" {
        return Ok(None);
    }
    let invalid = || RouteError::InvalidMethod {
        method: method.to_string(),
        path: path.to_string(),
    };
    let method = Method::from_bytes(normalized_method(method).as_bytes()).map_err(|_| invalid())?;
    MethodFilter::try_from(method).map(Some).map_err(|_| invalid())
}

fn validate_path(path: &str) -> Result<(), RouteError> {
    // Axum panics on `:param`, bare `*rest` and `{param*}` segments.
    let malformed = !path.starts_with('/')
        || path.split('/').any(|segment| {
            segment.starts_with(':')
                || segment.starts_with('*')
                || (segment.contains("*}") && !segment.starts_with("{*"))
        });
    if malformed {
        Err(RouteError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

/// Path tree of everything mounted, one entry per distinct path.
fn path_shape(table: &[MountedRoute]) -> matchit::Router<()> {
    let mut shape = matchit::Router::new();
    for route in table {
        // Repeated paths (other methods) are already in the tree.
        let _ = shape.insert(route.path.as_str(), ());
    }
    shape
}

/// Axum panics on what matchit rejects; surface it as an error instead.
fn insert_path(shape: &mut matchit::Router<()>, method: &str, path: &str) -> Result<(), RouteError> {
    match shape.insert(path, ()) {
        Ok(()) => Ok(()),
        Err(matchit::InsertError::Conflict { with }) => {
            tracing::debug!(path = %path, existing = %with, "Route shape conflict");
            Err(RouteError::Conflict {
                method: method.to_string(),
                path: path.to_string(),
            })
        }
        Err(error) => {
            tracing::debug!(path = %path, error = %error, "Malformed route path");
            Err(RouteError::InvalidPath(path.to_string()))
        }
    }
}

fn is_root_catch_all(path: &str) -> bool {
    path.starts_with("/{*") && path.ends_with('}') && !path[1..].contains('/')
}

fn conflicts(table: &[MountedRoute], method: &str, path: &str) -> bool {
    let methods: HashSet<&str> = table
        .iter()
        .filter(|r| r.path == path)
        .map(|r| r.method.as_str())
        .collect();
    if methods.is_empty() {
        return false;
    }
    method == "*" || methods.contains("*") || methods.contains(method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::auth::BearerScheme;
    use crate::routing::{handler_fn, DirectoryHandler, RouteOptions};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn named(name: &str) -> Handler {
        Handler::Named(name.into())
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn send(transport: &HttpTransport, method: &str, uri: &str, token: Option<&str>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        transport
            .app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_function_and_named_routes() {
        let mut transport = HttpTransport::new("/tmp");
        transport.handler("pong", handler_fn(|_req| async { "pong" }));
        transport
            .route(vec![
                RouteDescriptor::get("/hello", Handler::from_fn(|_req| async { "hello" })),
                RouteDescriptor::get("/ping", named("pong")),
            ])
            .unwrap();

        let response = send(&transport, "GET", "/hello", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(crate::http::X_REQUEST_ID));
        assert_eq!(body_text(response).await, "hello");

        let response = send(&transport, "GET", "/ping", None).await;
        assert_eq!(body_text(response).await, "pong");

        let response = send(&transport, "POST", "/hello", None).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_protected_route() {
        let mut transport = HttpTransport::new("/tmp");
        transport
            .auth_scheme("bearer", Arc::new(BearerScheme::new(vec!["t0ken".into()])))
            .unwrap();
        let route = RouteDescriptor {
            handler: None,
            config: Some(RouteOptions {
                auth: Some("bearer".into()),
                handler: Some(Handler::from_fn(|_req| async { "secret" })),
                ..RouteOptions::default()
            }),
            ..RouteDescriptor::get("/private", named("unused"))
        };
        transport.route(vec![route]).unwrap();

        assert_eq!(transport.routes()[0].auth.as_deref(), Some("bearer"));
        let denied = send(&transport, "GET", "/private", None).await;
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        let allowed = send(&transport, "GET", "/private", Some("t0ken")).await;
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(body_text(allowed).await, "secret");
    }

    #[tokio::test]
    async fn test_static_directory_and_root_alias() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "docs").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

        let mut transport = HttpTransport::new(dir.path());
        let static_route = RouteDescriptor::get(
            "/{*path}",
            Handler::Directory(DirectoryHandler {
                path: ".".into(),
                redirect_to_slash: true,
                index: true,
            }),
        );

        let err = transport.route(vec![static_route.clone()]).unwrap_err();
        assert!(matches!(err, RouteError::MissingCapability { capability: "files", .. }));

        transport.enable_files();
        transport.route(vec![static_route]).unwrap();
        assert_eq!(transport.routes().len(), 2);

        let root = send(&transport, "GET", "/", None).await;
        assert_eq!(body_text(root).await, "<h1>home</h1>");
        let script = send(&transport, "GET", "/app.js", None).await;
        assert_eq!(body_text(script).await, "console.log(1)");
        let redirect = send(&transport, "GET", "/docs", None).await;
        assert!(redirect.status().is_redirection());
        let missing = send(&transport, "GET", "/nope.txt", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_root_alias_yields_to_explicit_route() {
        let mut transport = HttpTransport::new("/tmp");
        transport.enable_files();
        transport
            .route(vec![
                RouteDescriptor::get(
                    "/{*path}",
                    Handler::Directory(DirectoryHandler {
                        path: ".".into(),
                        redirect_to_slash: true,
                        index: true,
                    }),
                ),
                RouteDescriptor::get("/", Handler::from_fn(|_req| async { "root" })),
            ])
            .unwrap();

        let root = send(&transport, "GET", "/", None).await;
        assert_eq!(body_text(root).await, "root");
    }

    #[tokio::test]
    async fn test_views() {
        let mut engine = Tera::default();
        engine
            .add_raw_template("hello.html", "Hello {{ name }}")
            .unwrap();
        let mut transport = HttpTransport::new("/tmp");
        let view = Handler::View(ViewHandler {
            template: "hello.html".into(),
            context: serde_json::json!({ "name": "world" }),
        });

        let err = transport
            .route(vec![RouteDescriptor::get("/hello", view.clone())])
            .unwrap_err();
        assert!(matches!(err, RouteError::MissingCapability { capability: "views", .. }));

        transport.set_views(engine);
        transport
            .route(vec![
                RouteDescriptor::get("/hello", view),
                RouteDescriptor::get(
                    "/broken",
                    Handler::View(ViewHandler {
                        template: "missing.html".into(),
                        context: serde_json::Value::Null,
                    }),
                ),
            ])
            .unwrap();

        let ok = send(&transport, "GET", "/hello", None).await;
        assert_eq!(body_text(ok).await, "Hello world");
        let broken = send(&transport, "GET", "/broken", None).await;
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_route_errors_leave_router_untouched() {
        let mut transport = HttpTransport::new("/tmp");
        let ok = || RouteDescriptor::get("/ok", Handler::from_fn(|_req| async { "ok" }));

        let err = transport
            .route(vec![ok(), RouteDescriptor::get("/x", named("missing"))])
            .unwrap_err();
        assert!(matches!(err, RouteError::UnknownHandler { .. }));
        assert!(transport.routes().is_empty());

        let mut no_handler = ok();
        no_handler.handler = None;
        assert!(matches!(
            transport.route(vec![no_handler]),
            Err(RouteError::MissingHandler { .. })
        ));
        assert!(matches!(
            transport.route(vec![RouteDescriptor::new("FETCH", "/ok", named("x"))]),
            Err(RouteError::InvalidMethod { .. })
        ));
        assert!(matches!(
            transport.route(vec![RouteDescriptor::get("ok", named("x"))]),
            Err(RouteError::InvalidPath(_))
        ));
        assert!(matches!(
            transport.route(vec![RouteDescriptor::get("/{param*}", named("x"))]),
            Err(RouteError::InvalidPath(_))
        ));

        let scheme_route = ok().with_config(RouteOptions {
            auth: Some("session".into()),
            ..RouteOptions::default()
        });
        assert!(matches!(
            transport.route(vec![scheme_route]),
            Err(RouteError::UnknownScheme { .. })
        ));
    }

    #[test]
    fn test_conflicts() {
        let mut transport = HttpTransport::new("/tmp");
        let h = || Handler::from_fn(|_req| async { "" });

        transport
            .route(vec![
                RouteDescriptor::get("/items", h()),
                RouteDescriptor::post("/items", h()),
            ])
            .unwrap();
        assert!(matches!(
            transport.route(vec![RouteDescriptor::get("/items", h())]),
            Err(RouteError::Conflict { .. })
        ));
        assert!(matches!(
            transport.route(vec![RouteDescriptor::new("*", "/items", h())]),
            Err(RouteError::Conflict { .. })
        ));
        assert_eq!(transport.routes().len(), 2);
    }

    #[test]
    fn test_path_shape_conflicts_are_errors() {
        let mut transport = HttpTransport::new("/tmp");
        transport.enable_files();
        let h = || Handler::from_fn(|_req| async { "" });

        let err = transport
            .route(vec![
                RouteDescriptor::get("/users/{id}", h()),
                RouteDescriptor::post("/users/{name}", h()),
            ])
            .unwrap_err();
        assert!(matches!(err, RouteError::Conflict { ref path, .. } if path == "/users/{name}"));
        assert!(transport.routes().is_empty());

        transport
            .route(vec![RouteDescriptor::get(
                "/{*path}",
                Handler::Directory(DirectoryHandler {
                    path: ".".into(),
                    redirect_to_slash: true,
                    index: true,
                }),
            )])
            .unwrap();
        assert!(matches!(
            transport.route(vec![RouteDescriptor::get("/{*rest}", h())]),
            Err(RouteError::Conflict { .. })
        ));
        assert!(matches!(
            transport.route(vec![RouteDescriptor::get("/a/{b", h())]),
            Err(RouteError::InvalidPath(_))
        ));

        // Same path, other method, still mounts.
        transport
            .route(vec![
                RouteDescriptor::get("/users/{id}", h()),
                RouteDescriptor::post("/users/{id}", h()),
            ])
            .unwrap();
        assert_eq!(transport.routes().len(), 4);
    }

    #[test]
    fn test_duplicate_scheme() {
        let mut transport = HttpTransport::new("/tmp");
        let scheme = Arc::new(BearerScheme::new(vec![]));
        transport.auth_scheme("bearer", scheme.clone()).unwrap();
        assert!(matches!(
            transport.auth_scheme("bearer", scheme),
            Err(TransportError::DuplicateScheme(_))
        ));
    }

    #[tokio::test]
    async fn test_start_binds_once() {
        let mut transport = HttpTransport::new("/tmp");
        transport.connection(ConnectionConfig {
            host: "127.0.0.1".into(),
            port: 0,
        });
        let info = transport.start().await.unwrap();
        assert_ne!(info.address.port(), 0);
        assert_eq!(info.uri, format!("http://{}", info.address));
        assert!(matches!(transport.start().await, Err(TransportError::AlreadyStarted)));
    }
}
