//! Plugin subsystem.
//!
//! # Data Flow
//! ```text
//! config.plugins (names)  ──► catalog.rs ──► PluginDescriptor[]
//! config.auth.module      ──► catalog.rs ──► AuthModuleSource
//!
//! PluginDescriptor[]
//!     → normalizer.rs (factories, contributed routes, records, hooks)
//!     → pipeline.rs (bulk register, sequential hooks)
//!     → PluginRegistration
//! ```
//!
//! # Design Decisions
//! - Descriptor shapes are one tagged enum, classified in a single pass
//! - Plugins are resolved by name at build time, never loaded at runtime
//! - Contributed routes travel in the returned `PluginRegistration`

pub mod builtin;
pub mod catalog;
pub mod descriptor;
pub mod normalizer;
pub mod pipeline;

pub use builtin::{BearerAuth, StaticFiles, Views};
pub use catalog::{AuthModule, AuthModuleFactory, AuthModuleSource, Catalog};
pub use descriptor::{
    DescriptorFactory, Plugin, PluginDescriptor, PluginRecord, PluginUnit, PostRegister, RouteProvider,
    RoutesProvider,
};
pub use normalizer::{normalize, PluginRegistrationInfo};
pub use pipeline::{PluginPipeline, PluginRegistration};
