//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binary
//! - Provide the [`Logger`] the server reports lifecycle events through
//!
//! # Design Decisions
//! - The logger is handed to the server builder, never looked up globally
//! - [`TracingLogger`] forwards to `tracing` with the detail as a field
//! - [`MemoryLogger`] keeps entries so callers can inspect what was reported

use std::sync::{Arc, Mutex};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sink for lifecycle messages.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str, detail: &str);

    fn error(&self, message: &str, detail: &str, error: &dyn std::error::Error);
}

/// Logger backed by `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str, detail: &str) {
        tracing::info!(detail = %detail, "{}", message);
    }

    fn error(&self, message: &str, detail: &str, error: &dyn std::error::Error) {
        tracing::error!(detail = %detail, error = %error, "{}", message);
    }
}

/// Severity of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// One recorded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub detail: String,
    pub error: Option<String>,
}

/// Logger that records entries in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Number of entries whose message starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.message.starts_with(prefix))
            .count()
    }

    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

impl Logger for MemoryLogger {
    fn info(&self, message: &str, detail: &str) {
        self.push(LogEntry {
            level: LogLevel::Info,
            message: message.to_string(),
            detail: detail.to_string(),
            error: None,
        });
    }

    fn error(&self, message: &str, detail: &str, error: &dyn std::error::Error) {
        self.push(LogEntry {
            level: LogLevel::Error,
            message: message.to_string(),
            detail: detail.to_string(),
            error: Some(error.to_string()),
        });
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let fallback = format!("service_host={level},tower_http={level}", level = default_level);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
