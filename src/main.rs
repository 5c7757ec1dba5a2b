//! Authenticating HTTP gateway.
//!
//! ```text
//!     Client ──GET──▶ ┌──────────────────────────────────────────────┐
//!                     │ logout? ──yes──▶ clear cookie, "logout"       │
//!                     │    │no                                        │
//!                     │ authenticate (cookie, or user/password)       │
//!                     │    │ok                                        │
//!                     │ acquire pooled connection ──▶ fetch ──────────┼──▶ Backend
//!                     │    │                                          │
//!     Client ◀──────  │ content + session cookie                      │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use auth_gateway::config::{load_config, GatewayConfig};
use auth_gateway::lifecycle::{wait_for_signal, Shutdown};
use auth_gateway::observability::{logging, metrics};
use auth_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "auth-gateway", version, about = "Authenticating HTTP gateway")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "auth-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.address,
        pool_size = config.pool.size,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                tracing::info!(signal, "Signal received");
                shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for signals"),
        }
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
