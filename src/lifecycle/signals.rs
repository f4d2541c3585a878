//! OS signal handling.
//!
//! # Responsibilities
//! - Register the operational signal handlers
//! - Translate each signal into the matching server entry point
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP reloads the endpoint registry, not the whole process
//! - Config re-read failures keep the running configuration

use std::path::PathBuf;
use std::sync::Arc;

use crate::config;
use crate::server::Server;

/// Spawn the signal dispatch task.
///
/// On platforms without Unix signals the task is a no-op; the same
/// operations remain reachable through the server handle.
#[cfg(unix)]
pub fn spawn_signal_task(server: Arc<Server>, config_path: PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "installing SIGHUP handler failed");
                return;
            }
        };
        let mut usr1 = match signal(SignalKind::user_defined1()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "installing SIGUSR1 handler failed");
                return;
            }
        };
        let mut usr2 = match signal(SignalKind::user_defined2()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "installing SIGUSR2 handler failed");
                return;
            }
        };
        let mut winch = match signal(SignalKind::window_change()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "installing SIGWINCH handler failed");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = hangup.recv() => {
                    tracing::info!("SIGHUP: reloading endpoint registry");
                    server.reload_registry();
                }
                _ = usr1.recv() => {
                    tracing::info!("SIGUSR1: re-reading config document");
                    match config::load_config(&config_path) {
                        Ok(_) => tracing::info!(
                            path = %config_path.display(),
                            "config document valid; listener settings apply on restart"
                        ),
                        Err(e) => tracing::error!(error = %e, "config re-read failed"),
                    }
                }
                _ = usr2.recv() => {
                    tracing::info!("SIGUSR2: reopening log files");
                    server.reopen_logs();
                }
                _ = winch.recv() => {
                    tracing::info!("SIGWINCH: purging resolve cache");
                    server.purge_cache();
                }
            }
        }
    });
}

#[cfg(not(unix))]
pub fn spawn_signal_task(_server: Arc<Server>, _config_path: PathBuf) {
    tracing::warn!("signal-driven reload unavailable on this platform");
}
