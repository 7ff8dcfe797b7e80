//! Simple HTTP server (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────┐
//!   │                         SIMPLE SERVER                          │
//!   │                                                                │
//!   │  ┌─────────────┐  handoff  ┌─────────────┐  spawn  ┌────────┐  │
//!   │  │ accept loop │──────────▶│ server loop │────────▶│ worker │  │
//!   │  │ (net)       │  (cap 1)  │ (select!)   │         └───┬────┘  │
//!   │  └─────────────┘           └──────▲──────┘             │       │
//!   │         ▲                         │                    ▼       │
//!   │         │        ┌────────────────┴──┐       decode → lookup   │
//!   │         └────────│ shutdown (watch)  │       → handler (panic  │
//!   │                  └───────────────────┘         boundary)       │
//!   │                                                → response      │
//!   └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use simple_server::config::{load_config, ServerConfig};
use simple_server::lifecycle::{wait_for_signal, Shutdown};
use simple_server::net::bind;
use simple_server::observability::{logging, metrics};
use simple_server::{HttpServer, Registry};

#[derive(Parser)]
#[command(name = "simple-server")]
#[command(about = "Minimal single-request HTTP server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

fn build_registry() -> Result<Registry, simple_server::RegistryError> {
    let mut registry = Registry::new();

    registry.register("POST", "/echo", |w, r| {
        Box::pin(async move {
            if let Err(e) = w.write(&r.payload).await {
                tracing::error!(error = %e, "Error handling request");
                return;
            }
            tracing::debug!("Successfully written data");
        })
    })?;

    registry.register("GET", "/test", |w, _| {
        Box::pin(async move {
            if let Err(e) = w.set_status(200).await {
                tracing::error!(error = %e, "Error handling request");
            }
        })
    })?;

    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind_address) = cli.bind {
        config.listener.bind_address = bind_address;
    }

    logging::init(&config.observability)?;
    tracing::info!("simple-server v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        server_name = %config.http.server_name,
        drain_timeout_secs = config.http.drain_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let registry = build_registry()?;
    let listener = bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, registry);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    server_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
