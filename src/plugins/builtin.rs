//! Built-in plugins.
//!
//! - [`StaticFiles`] enables `directory` and `file` handlers
//! - [`Views`] loads templates for `view` handlers
//! - the `bearer` auth module registers a [`BearerScheme`]

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tera::Tera;

use crate::config::ServerConfig;
use crate::error::PluginError;
use crate::http::{BearerScheme, HttpTransport};
use crate::plugins::catalog::{AuthModule, AuthModuleFactory, AuthModuleSource};
use crate::plugins::descriptor::{Plugin, PluginDescriptor, PluginUnit};

/// Catalog name and scheme name of the bearer auth module.
pub const BEARER: &str = "bearer";

const DEFAULT_VIEWS_PATH: &str = "views";

/// Serves files from the web root.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFiles;

#[async_trait]
impl Plugin for StaticFiles {
    fn name(&self) -> &str {
        "static-files"
    }

    async fn register(&self, server: &mut HttpTransport, _options: &Value) -> Result<(), PluginError> {
        server.enable_files();
        Ok(())
    }
}

/// Renders `tera` templates found under `<web_root>/<path>`.
///
/// Options: `{ "path": "views" }`. A missing directory leaves an empty engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Views;

impl Views {
    fn directory(server: &HttpTransport, options: &Value) -> PathBuf {
        let relative = options
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VIEWS_PATH);
        server.web_root().join(relative)
    }
}

#[async_trait]
impl Plugin for Views {
    fn name(&self) -> &str {
        "views"
    }

    async fn register(&self, server: &mut HttpTransport, options: &Value) -> Result<(), PluginError> {
        let dir = Self::directory(server, options);
        let engine = if dir.is_dir() {
            let pattern = format!("{}/**/*.html", dir.display());
            Tera::new(&pattern).map_err(|error| PluginError::Registration {
                name: self.name().to_string(),
                reason: error.to_string(),
            })?
        } else {
            tracing::debug!(path = %dir.display(), "No views directory");
            Tera::default()
        };

        tracing::debug!(templates = engine.get_template_names().count(), "Views loaded");
        server.set_views(engine);
        Ok(())
    }
}

/// Registers the `bearer` auth scheme with a fixed token list.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    tokens: Vec<String>,
}

impl BearerAuth {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Plugin for BearerAuth {
    fn name(&self) -> &str {
        "bearer-auth"
    }

    async fn register(&self, server: &mut HttpTransport, _options: &Value) -> Result<(), PluginError> {
        if self.tokens.is_empty() {
            tracing::warn!("Bearer auth registered without tokens; protected routes will reject every request");
        }
        server
            .auth_scheme(BEARER, Arc::new(BearerScheme::new(self.tokens.clone())))
            .map_err(|error| PluginError::Registration {
                name: self.name().to_string(),
                reason: error.to_string(),
            })
    }
}

struct BearerModule;

#[async_trait]
impl AuthModuleFactory for BearerModule {
    async fn create(&self, _server: &HttpTransport, config: &ServerConfig) -> Result<AuthModule, PluginError> {
        let tokens: Vec<String> = match config.auth.as_ref().and_then(|auth| auth.options.get("tokens")) {
            None => Vec::new(),
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value.as_str().map(str::to_string).ok_or_else(|| PluginError::Registration {
                        name: BEARER.to_string(),
                        reason: "`tokens` must contain strings".into(),
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(PluginError::Registration {
                    name: BEARER.to_string(),
                    reason: "`tokens` must be an array".into(),
                })
            }
        };

        Ok(AuthModule {
            default_scheme: Some(BEARER.to_string()),
            descriptor: PluginDescriptor::plugin(PluginUnit::new(BearerAuth::new(tokens))),
        })
    }
}

/// Catalog entry for the `bearer` auth module.
///
/// Reads `[auth.options] tokens = [...]`.
pub fn bearer_module() -> AuthModuleSource {
    AuthModuleSource::Factory(Arc::new(BearerModule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_files_enables_capability() {
        let mut server = HttpTransport::new("/tmp");
        StaticFiles.register(&mut server, &Value::Null).await.unwrap();
        assert!(server.files_enabled());
    }

    #[tokio::test]
    async fn test_views_loads_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pages/partials")).unwrap();
        std::fs::write(dir.path().join("pages/home.html"), "home").unwrap();
        std::fs::write(dir.path().join("pages/partials/nav.html"), "nav").unwrap();

        let mut server = HttpTransport::new(dir.path());
        Views
            .register(&mut server, &json!({ "path": "pages" }))
            .await
            .unwrap();

        let mut names: Vec<&str> = server.views().unwrap().get_template_names().collect();
        names.sort();
        assert_eq!(names, vec!["home.html", "partials/nav.html"]);
    }

    #[tokio::test]
    async fn test_views_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = HttpTransport::new(dir.path());
        Views.register(&mut server, &Value::Null).await.unwrap();
        assert_eq!(server.views().unwrap().get_template_names().count(), 0);
    }

    fn with_tokens(options: Value) -> ServerConfig {
        ServerConfig {
            auth: Some(AuthConfig {
                module: Some(BEARER.into()),
                options,
                ..AuthConfig::default()
            }),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bearer_module() {
        let mut server = HttpTransport::new("/tmp");
        let config = with_tokens(json!({ "tokens": ["a", "b"] }));

        let module = BearerModule.create(&server, &config).await.unwrap();
        assert_eq!(module.default_scheme.as_deref(), Some(BEARER));

        let PluginDescriptor::Plugin { unit, .. } = module.descriptor else {
            panic!("expected a plugin descriptor");
        };
        unit.plugin.register(&mut server, &Value::Null).await.unwrap();
        assert!(server.has_auth_scheme(BEARER));
    }

    #[tokio::test]
    async fn test_bearer_module_rejects_bad_tokens() {
        let server = HttpTransport::new("/tmp");

        let err = BearerModule
            .create(&server, &with_tokens(json!({ "tokens": "a" })))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Registration { .. }));

        let err = BearerModule
            .create(&server, &with_tokens(json!({ "tokens": [1] })))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Registration { .. }));
    }
}
