//! Route descriptors and handlers.
//!
//! A [`RouteDescriptor`] is the declarative form of a route. Descriptors come
//! from config files, route modules and plugins, and are only ever rewritten
//! into new values (see [`crate::routing::auth`]).

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Methods a descriptor may name. `*` matches every method.
const METHODS: &[&str] = &[
    "*", "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

pub(crate) fn is_supported_method(method: &str) -> bool {
    METHODS.iter().any(|m| m.eq_ignore_ascii_case(method))
}

/// Boxed async request handler.
pub type HandlerFn = Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wrap an async closure as a [`HandlerFn`].
pub fn handler_fn<F, Fut, R>(f: F) -> HandlerFn
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |request| {
        let fut = f(request);
        async move { fut.await.into_response() }.boxed()
    })
}

/// What a route does when it matches.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handler {
    /// Rust closure. Only constructible in code.
    #[serde(skip)]
    Function(HandlerFn),

    /// Serve a directory relative to the web root.
    Directory(DirectoryHandler),

    /// Serve a single file relative to the web root.
    File(PathBuf),

    /// Render a template with the views plugin.
    View(ViewHandler),

    /// Handler a plugin registered on the transport under this name.
    Named(String),
}

impl Handler {
    /// Build a [`Handler::Function`] from an async closure.
    pub fn from_fn<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Handler::Function(handler_fn(f))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Function(_) => f.write_str("Function(..)"),
            Handler::Directory(d) => f.debug_tuple("Directory").field(d).finish(),
            Handler::File(p) => f.debug_tuple("File").field(p).finish(),
            Handler::View(v) => f.debug_tuple("View").field(v).finish(),
            Handler::Named(n) => f.debug_tuple("Named").field(n).finish(),
        }
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Handler::Function(a), Handler::Function(b)) => Arc::ptr_eq(a, b),
            (Handler::Directory(a), Handler::Directory(b)) => a == b,
            (Handler::File(a), Handler::File(b)) => a == b,
            (Handler::View(a), Handler::View(b)) => a == b,
            (Handler::Named(a), Handler::Named(b)) => a == b,
            _ => false,
        }
    }
}

/// Directory listing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryHandler {
    /// Directory relative to the web root.
    pub path: PathBuf,

    /// Redirect `/dir` to `/dir/` before serving its index.
    #[serde(default = "default_true")]
    pub redirect_to_slash: bool,

    /// Serve `index.html` for directory requests.
    #[serde(default = "default_true")]
    pub index: bool,
}

fn default_true() -> bool {
    true
}

/// Template rendered by the views plugin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewHandler {
    /// Template name relative to the views directory.
    pub template: String,

    /// Values exposed to the template.
    #[serde(default)]
    pub context: Value,
}

/// Nested route configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RouteOptions {
    /// Auth scheme the transport enforces for this route.
    #[serde(default)]
    pub auth: Option<String>,

    /// Handler, when it lives in the nested config rather than on the route.
    #[serde(default)]
    pub handler: Option<Handler>,

    /// Every other nested field, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Declarative mapping of method + path to a handler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteDescriptor {
    pub method: String,

    pub path: String,

    #[serde(default)]
    pub handler: Option<Handler>,

    #[serde(default)]
    pub config: Option<RouteOptions>,

    /// Opt-in marker for the auth policy. Consumed by `append_auth`.
    #[serde(default)]
    pub auth: Option<bool>,
}

impl RouteDescriptor {
    pub fn new(method: impl Into<String>, path: impl Into<String>, handler: Handler) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            handler: Some(handler),
            config: None,
            auth: None,
        }
    }

    pub fn get(path: impl Into<String>, handler: Handler) -> Self {
        Self::new("GET", path, handler)
    }

    pub fn post(path: impl Into<String>, handler: Handler) -> Self {
        Self::new("POST", path, handler)
    }

    /// Set the auth marker.
    pub fn with_auth(mut self, auth: bool) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Attach nested config.
    pub fn with_config(mut self, config: RouteOptions) -> Self {
        self.config = Some(config);
        self
    }

    /// True when the route opts into the auth policy.
    pub fn requests_auth(&self) -> bool {
        self.auth.unwrap_or(false)
    }

    /// Top-level handler, falling back to the nested one.
    pub fn resolved_handler(&self) -> Option<&Handler> {
        self.handler
            .as_ref()
            .or_else(|| self.config.as_ref().and_then(|c| c.handler.as_ref()))
    }

    /// Scheme the transport will enforce, if any.
    pub fn auth_scheme(&self) -> Option<&str> {
        self.config.as_ref().and_then(|c| c.auth.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Table {
        routes: Vec<RouteDescriptor>,
    }

    #[test]
    fn test_deserialize_handler_kinds() {
        let table: Table = toml::from_str(
            r#"
            [[routes]]
            method = "GET"
            path = "/{*path}"
            handler = { directory = { path = "." } }

            [[routes]]
            method = "GET"
            path = "/favicon.ico"
            handler = { file = "img/favicon.ico" }

            [[routes]]
            method = "GET"
            path = "/home"
            auth = true
            handler = { view = { template = "home.html", context = { title = "Home" } } }

            [[routes]]
            method = "POST"
            path = "/hooks"
            [routes.config]
            auth = "bearer"
            description = "incoming hooks"
            handler = { named = "hooks" }
            "#,
        )
        .unwrap();

        let routes = table.routes;
        assert_eq!(
            routes[0].handler,
            Some(Handler::Directory(DirectoryHandler {
                path: ".".into(),
                redirect_to_slash: true,
                index: true,
            }))
        );
        assert_eq!(routes[1].handler, Some(Handler::File("img/favicon.ico".into())));
        assert_eq!(
            routes[2].handler,
            Some(Handler::View(ViewHandler {
                template: "home.html".into(),
                context: json!({ "title": "Home" }),
            }))
        );
        assert!(routes[2].requests_auth());

        let config = routes[3].config.as_ref().unwrap();
        assert_eq!(config.auth.as_deref(), Some("bearer"));
        assert_eq!(config.extra.get("description"), Some(&json!("incoming hooks")));
        assert!(routes[3].handler.is_none());
        assert_eq!(routes[3].resolved_handler(), Some(&Handler::Named("hooks".into())));
        assert_eq!(routes[3].auth_scheme(), Some("bearer"));
    }

    #[test]
    fn test_function_handlers_compare_by_identity() {
        let a = Handler::from_fn(|_req| async { "a" });
        let b = Handler::from_fn(|_req| async { "a" });
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_supported_methods() {
        assert!(is_supported_method("get"));
        assert!(is_supported_method("*"));
        assert!(!is_supported_method("FETCH"));
    }
}
