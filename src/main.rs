//! mirror302: HTTP redirect service for software mirrors.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  mirror302                    │
//!                      │                                               │
//!  GET /<cname>/<tail> │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!  ────────────────────┼─▶│ server  │──▶│   meta   │──▶│  resolve  │  │
//!                      │  │ (axum)  │   │  parser  │   │   cache   │  │
//!                      │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                      │                                 miss │ stale  │
//!                      │                                      ▼        │
//!                      │  ┌──────────┐   ┌──────────┐   ┌───────────┐ │
//!  302 Found           │  │ registry │◀──│ scoring  │◀──│ freshness │─┼──▶ InfluxDB
//!  ◀───────────────────┼──│ (mirror  │   │ (select) │   │  source   │ │
//!                      │  │  z.d)    │   └──────────┘   └───────────┘ │
//!                      │  └──────────┘                                 │
//!                      │                                               │
//!                      │  Cross-cutting: config · geo · logging ·      │
//!                      │  lifecycle (signals, shutdown) · metrics      │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirror302::config;
use mirror302::lifecycle::{signals, Shutdown};
use mirror302::observability::metrics;
use mirror302::Server;

#[derive(Parser)]
#[command(name = "mirror302")]
#[command(about = "HTTP redirect service for software mirrors", long_about = None)]
struct Cli {
    /// Path to the TOML config document.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Force debug-level diagnostics.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.config)?;

    let default_filter = if cli.debug {
        "mirror302=debug,tower_http=debug".to_string()
    } else {
        format!("mirror302={}", config.observability.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        bind_address = %config.http_bind_address,
        mirrorz_d = %config.mirrorz_d_directory.display(),
        cache_time_secs = config.cache_time,
        domain_length = config.domain_length,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.http_bind_address.clone();
    let server = Arc::new(Server::new(config)?);

    let shutdown = Shutdown::new();
    server.spawn_gc_ticker(shutdown.subscribe());
    signals::spawn_signal_task(server.clone(), cli.config.clone());

    let listener = TcpListener::bind(&bind_address).await?;

    let shutdown_tx = shutdown;
    let ctrl_c_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown_tx.trigger();
        }
    });

    server.run(listener, ctrl_c_rx).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
