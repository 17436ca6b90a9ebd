//! API gateway
//!
//! A reverse-proxy gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::gateway ──▶ routing (snapshot match)
//!                                            │
//!                                            ▼
//!                                    filters (before hooks)
//!                                            │
//!                                            ▼
//!                                    dispatch (pooled HTTP/1.1, timeout) ──▶ Upstream
//!                                            │
//!                                            ▼
//!                                    filters (after hooks, reverse order)
//!                                            │
//!                                            ▼
//!     Client Response ◀────────────── fallback (on failure / no route)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_gateway::config::{load_config, parse_config, ConfigWatcher, GatewayConfig};
use api_gateway::lifecycle::{signals, Shutdown};
use api_gateway::observability::{logging::init_logging, metrics::init_metrics};
use api_gateway::HttpServer;

/// Routes bundled with the binary, used when no config file is given.
const BUNDLED_CONFIG: &str = include_str!("../config/gateway.toml");

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "Reverse-proxy API gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Reload routes when the configuration file changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config: GatewayConfig = match &cli.config {
        Some(path) => load_config(path)?,
        None => parse_config(BUNDLED_CONFIG)?,
    };

    init_logging(&config.observability);

    tracing::info!("api-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_shutdown_listener(shutdown.clone());

    // Held for the lifetime of the server; dropping it stops file watching.
    let mut _file_watcher = None;
    let config_updates = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            #[cfg(unix)]
            {
                let reloader = watcher.clone();
                signals::spawn_reload_listener(&shutdown, move || reloader.reload_now());
            }
            if cli.watch {
                _file_watcher = Some(watcher.run()?);
            }
            updates
        }
        None => {
            if cli.watch {
                tracing::warn!("--watch has no effect without --config");
            }
            mpsc::unbounded_channel().1
        }
    };

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
