//! Versioned API router server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum, timeout, body limit, request id)
//!                          │
//!                          ▼
//!                     routing::router ── API? ──▶ media_type → resolver
//!                          │                          │
//!                          │ plain                    ▼
//!                          ▼                   version collection
//!                     plain collection              │
//!                          │                          ▼
//!                          └────────▶ handler ◀──────┘
//!                                       │
//!                          ┌────────────┴────────────┐
//!                          ▼                         ▼
//!                   ResponseFormat          ExceptionTranslator
//!                          │                         │
//!     Client Response ◀────┴─────────────────────────┘
//!
//!     config::watcher ──▶ config::routes ──▶ new Router swapped into server
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_router::config::{load_config, routes::build_router, watcher::ConfigWatcher, AppConfig};
use api_router::http::HttpServer;
use api_router::lifecycle::{wait_for_signal, Shutdown};
use api_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "api-router")]
#[command(about = "Versioned API router driven by vendor media types", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Watch the configuration file and reload routes on change.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability).context("installing tracing subscriber")?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-router starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        vendor = %config.api.vendor,
        default_version = %config.api.default_version,
        groups = config.groups.len(),
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

    let router = build_router(&config).context("building router")?;

    let shutdown = Shutdown::new();
    let (router_tx, router_rx) = mpsc::unbounded_channel();

    // Dropping the watcher handle stops watching, so it lives until main returns.
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run().context("starting config watcher")?;
            tokio::spawn(async move {
                while let Some(config) = updates.recv().await {
                    match build_router(&config) {
                        Ok(router) => {
                            let _ = router_tx.send(router);
                        }
                        Err(e) => tracing::error!(error = %e, "Reloaded config produced an invalid router"),
                    }
                }
            });
            Some(handle)
        }
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .with_context(|| format!("binding {}", config.listener.bind_address))?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    tokio::spawn(wait_for_signal(shutdown.clone()));

    let server = HttpServer::new(router, &config);
    server.run(listener, router_rx, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
