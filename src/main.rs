//! Service host binary.
//!
//! ```text
//! service-host [--config PATH]
//!     → load + validate config (defaults when no file is given)
//!     → init tracing
//!     → Server::start (plugins → hooks → routes → listen)
//!     → wait for Ctrl+C
//! ```

use std::path::PathBuf;

use clap::Parser;

use service_host::config::{load_config, ServerConfig};
use service_host::observability::init_tracing;
use service_host::Server;

#[derive(Debug, Parser)]
#[command(name = "service-host", version, about = "Compose and serve plugins and routes over HTTP")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_tracing(&config.observability.log_level);

    tracing::info!(
        address = %config.connection.address(),
        web_root = %config.web_root.display(),
        routes_path = %config.routes_path.display(),
        plugins = config.plugins.len(),
        "service-host v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let mut server = Server::builder(config).build()?;
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    Ok(())
}
