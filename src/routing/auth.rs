//! Auth policy injection.
//!
//! Routes opt into authentication with the top-level `auth` marker. The
//! injector resolves that marker against the server's [`AuthPolicy`] and
//! leaves the transport a nested `config.auth` scheme name, which is the only
//! thing the transport looks at.

use serde_json::Map;

use crate::config::AuthConfig;
use crate::routing::descriptor::{RouteDescriptor, RouteOptions};

/// Scheme applied to every route that opts into auth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthPolicy {
    /// Scheme name registered on the transport.
    pub scheme: Option<String>,

    /// Whether the static-files route requires auth.
    pub protect_static: bool,
}

impl AuthPolicy {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            scheme: config.scheme.clone(),
            protect_static: config.static_files,
        }
    }

    /// Adopt `scheme` unless one is already configured. Returns whether it was adopted.
    pub fn adopt_default(&mut self, scheme: &str) -> bool {
        if self.scheme.is_some() {
            return false;
        }
        self.scheme = Some(scheme.to_string());
        true
    }
}

/// Resolve the auth marker on every route against `policy`.
pub fn append_auth(policy: Option<&AuthPolicy>, routes: &[RouteDescriptor]) -> Vec<RouteDescriptor> {
    routes.iter().map(|route| inject(policy, route)).collect()
}

fn inject(policy: Option<&AuthPolicy>, route: &RouteDescriptor) -> RouteDescriptor {
    let mut out = RouteDescriptor {
        auth: None,
        ..route.clone()
    };

    let Some(policy) = policy else {
        return out;
    };
    if !route.requests_auth() {
        return out;
    }

    out.config = Some(match out.config.take() {
        Some(config) => RouteOptions {
            auth: policy.scheme.clone(),
            ..config
        },
        None => RouteOptions {
            auth: policy.scheme.clone(),
            handler: out.handler.take(),
            extra: Map::new(),
        },
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Handler;
    use serde_json::json;

    fn session() -> AuthPolicy {
        AuthPolicy {
            scheme: Some("session".into()),
            protect_static: false,
        }
    }

    fn sample_routes() -> Vec<RouteDescriptor> {
        let h = Handler::Named("h".into());
        vec![
            RouteDescriptor::get("/a", h.clone()).with_auth(true),
            RouteDescriptor::get("/b", h.clone()).with_auth(false),
            RouteDescriptor::get("/c", h.clone()),
            RouteDescriptor::post("/d", h).with_auth(true).with_config(RouteOptions {
                auth: Some("other".into()),
                ..RouteOptions::default()
            }),
        ]
    }

    #[test]
    fn test_without_policy_only_strips_marker() {
        let routes = sample_routes();
        let out = append_auth(None, &routes);

        assert_eq!(out.len(), routes.len());
        for (before, after) in routes.iter().zip(&out) {
            assert_eq!(after.auth, None);
            assert_eq!(after.method, before.method);
            assert_eq!(after.path, before.path);
            assert_eq!(after.handler, before.handler);
            assert_eq!(after.config, before.config);
        }
    }

    #[test]
    fn test_moves_handler_into_synthesized_config() {
        let handler = Handler::from_fn(|_req| async { "x" });
        let route = RouteDescriptor::get("/x", handler.clone()).with_auth(true);

        let out = append_auth(Some(&session()), &[route]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].handler, None);
        assert_eq!(out[0].auth, None);
        assert_eq!(
            out[0].config,
            Some(RouteOptions {
                auth: Some("session".into()),
                handler: Some(handler),
                extra: Map::new(),
            })
        );
    }

    #[test]
    fn test_merges_into_existing_config() {
        let mut extra = Map::new();
        extra.insert("description".into(), json!("admin"));
        let route = RouteDescriptor::get("/admin", Handler::Named("admin".into()))
            .with_auth(true)
            .with_config(RouteOptions {
                auth: None,
                handler: None,
                extra: extra.clone(),
            });

        let out = append_auth(Some(&session()), &[route]);
        let config = out[0].config.as_ref().unwrap();

        assert_eq!(config.auth.as_deref(), Some("session"));
        assert_eq!(config.extra, extra);
        assert_eq!(out[0].handler, Some(Handler::Named("admin".into())));
        assert_eq!(out[0].auth, None);
    }

    #[test]
    fn test_routes_not_requesting_auth_pass_through() {
        let routes = sample_routes();
        let out = append_auth(Some(&session()), &routes);

        assert_eq!(out[1].config, None);
        assert_eq!(out[1].handler, routes[1].handler);
        assert_eq!(out[2].config, None);
        assert_eq!(out[3].auth_scheme(), Some("session"));
    }

    #[test]
    fn test_input_is_untouched() {
        let routes = sample_routes();
        let copy = routes.clone();
        let _ = append_auth(Some(&session()), &routes);
        assert_eq!(routes, copy);
    }

    #[test]
    fn test_adopt_default_only_when_unset() {
        let mut policy = AuthPolicy::default();
        assert!(policy.adopt_default("bearer"));
        assert!(!policy.adopt_default("session"));
        assert_eq!(policy.scheme.as_deref(), Some("bearer"));
    }
}
