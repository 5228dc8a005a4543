//! Route module discovery.
//!
//! # Responsibilities
//! - Load the top-level `index` module of the routes directory
//! - Enumerate `*/index` modules when there is no top-level index
//!
//! # Design Decisions
//! - Modules are resolved through the [`RouteModules`] trait, never by
//!   loading code at runtime
//! - [`FileRouteModules`] reads declarative `index.toml` files
//! - [`StaticRouteModules`] is a registry built in code, for modules whose
//!   handlers are closures
//! - Enumeration order is sorted by directory name

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::RouteModuleError;
use crate::routing::descriptor::RouteDescriptor;

const INDEX: &str = "index";

/// Source of route modules.
pub trait RouteModules: Send + Sync {
    /// Load `<root>/index` when `module` is `None`, else `<root>/<module>/index`.
    fn load(&self, root: &Path, module: Option<&str>) -> Result<Vec<RouteDescriptor>, RouteModuleError>;

    /// Names of immediate subdirectories of `root` that hold an index module.
    fn discover(&self, root: &Path) -> Vec<String>;
}

/// Route modules stored as `index.toml` files.
///
/// ```toml
/// [[routes]]
/// method = "GET"
/// path = "/health"
/// handler = { named = "health" }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRouteModules;

#[derive(Deserialize)]
struct RouteModuleFile {
    #[serde(default)]
    routes: Vec<RouteDescriptor>,
}

impl FileRouteModules {
    fn index_file(root: &Path, module: Option<&str>) -> PathBuf {
        let dir = match module {
            Some(name) => root.join(name),
            None => root.to_path_buf(),
        };
        dir.join(INDEX).with_extension("toml")
    }
}

impl RouteModules for FileRouteModules {
    fn load(&self, root: &Path, module: Option<&str>) -> Result<Vec<RouteDescriptor>, RouteModuleError> {
        let path = Self::index_file(root, module);
        let content = fs::read_to_string(&path).map_err(|source| RouteModuleError::Io {
            path: path.clone(),
            source,
        })?;
        let file: RouteModuleFile =
            toml::from_str(&content).map_err(|source| RouteModuleError::Parse { path, source })?;
        Ok(file.routes)
    }

    fn discover(&self, root: &Path) -> Vec<String> {
        let Ok(entries) = fs::read_dir(root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| Self::index_file(root, Some(name)).is_file())
            .collect();
        names.sort();
        names
    }
}

type ModuleLoader = Arc<dyn Fn() -> Result<Vec<RouteDescriptor>, RouteModuleError> + Send + Sync>;

/// Route modules registered in code.
///
/// The routes root is ignored; modules are keyed by subdirectory name.
#[derive(Clone, Default)]
pub struct StaticRouteModules {
    index: Option<ModuleLoader>,
    modules: BTreeMap<String, ModuleLoader>,
}

impl StaticRouteModules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the top-level index module.
    pub fn index(mut self, routes: Vec<RouteDescriptor>) -> Self {
        self.index = Some(Arc::new(move || Ok(routes.clone())));
        self
    }

    /// Register `<name>/index`.
    pub fn module(self, name: impl Into<String>, routes: Vec<RouteDescriptor>) -> Self {
        self.module_with(name, move || Ok(routes.clone()))
    }

    /// Register `<name>/index` with a loader that may fail.
    pub fn module_with<F>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Vec<RouteDescriptor>, RouteModuleError> + Send + Sync + 'static,
    {
        self.modules.insert(name.into(), Arc::new(loader));
        self
    }
}

impl RouteModules for StaticRouteModules {
    fn load(&self, root: &Path, module: Option<&str>) -> Result<Vec<RouteDescriptor>, RouteModuleError> {
        let loader = match module {
            None => self.index.as_ref(),
            Some(name) => self.modules.get(name),
        };
        match loader {
            Some(load) => load(),
            None => {
                let relative = module.map(|m| Path::new(m).join(INDEX)).unwrap_or_else(|| PathBuf::from(INDEX));
                Err(RouteModuleError::NotFound(root.join(relative)))
            }
        }
    }

    fn discover(&self, _root: &Path) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }
}
