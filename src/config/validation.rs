//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route descriptors are mountable
//! - Check auth and plugin settings are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use crate::config::schema::ServerConfig;
use crate::routing::descriptor::is_supported_method;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("route #{index}: path `{path}` must start with `/`")]
    RoutePath { index: usize, path: String },

    #[error("route #{index}: unsupported method `{method}`")]
    RouteMethod { index: usize, method: String },

    #[error("route #{index}: no handler for {path}")]
    RouteHandler { index: usize, path: String },

    #[error("auth.scheme must not be empty")]
    EmptyScheme,

    #[error("auth.module must not be empty")]
    EmptyModule,

    #[error("plugin `{0}` is listed more than once")]
    DuplicatePlugin(String),

    #[error("web_root must not be empty")]
    EmptyWebRoot,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, route) in config.routes.iter().enumerate() {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::RoutePath {
                index,
                path: route.path.clone(),
            });
        }
        if !is_supported_method(&route.method) {
            errors.push(ValidationError::RouteMethod {
                index,
                method: route.method.clone(),
            });
        }
        if route.resolved_handler().is_none() {
            errors.push(ValidationError::RouteHandler {
                index,
                path: route.path.clone(),
            });
        }
    }

    if let Some(auth) = &config.auth {
        if auth.scheme.as_deref().is_some_and(str::is_empty) {
            errors.push(ValidationError::EmptyScheme);
        }
        if auth.module.as_deref().is_some_and(str::is_empty) {
            errors.push(ValidationError::EmptyModule);
        }
    }

    let mut seen = HashSet::new();
    for name in &config.plugins {
        if !seen.insert(name.as_str()) {
            errors.push(ValidationError::DuplicatePlugin(name.clone()));
        }
    }

    if config.web_root.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyWebRoot);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::routing::{Handler, RouteDescriptor};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServerConfig::default();
        config.routes.push(RouteDescriptor {
            method: "FETCH".into(),
            path: "users".into(),
            handler: None,
            config: None,
            auth: None,
        });
        config.routes.push(RouteDescriptor::new("GET", "/ok", Handler::Named("ok".into())));
        config.auth = Some(AuthConfig {
            scheme: Some(String::new()),
            ..AuthConfig::default()
        });
        config.plugins = vec!["a".into(), "a".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::RoutePath { index: 0, path: "users".into() },
                ValidationError::RouteMethod { index: 0, method: "FETCH".into() },
                ValidationError::RouteHandler { index: 0, path: "users".into() },
                ValidationError::EmptyScheme,
                ValidationError::DuplicatePlugin("a".into()),
            ]
        );
    }
}
