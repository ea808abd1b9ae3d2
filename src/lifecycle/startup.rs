//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems from the validated config in dependency order
//! - Bind the listener and run the server until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::backend::{BackendError, HttpControlPlane};
use crate::config::BridgeConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_shutdown_signal;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;
use crate::server::BridgeServer;
use crate::session::{Dispatcher, DispatcherSettings, FileSecret};

/// Errors that stop the bridge from starting or running.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("signal handling failed: {0}")]
    Signal(#[source] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Build the dispatcher from config, wiring the HTTP control plane and the
/// secret file.
pub fn build_dispatcher(config: &BridgeConfig) -> Result<Dispatcher, BackendError> {
    let control_plane = Arc::new(HttpControlPlane::new(&config.api)?);
    let secret = Arc::new(FileSecret::new(&config.auth.secret_file));
    tracing::info!(secret_file = %config.auth.secret_file, "Using Varnish CLI secret file");

    Ok(Dispatcher::new(
        DispatcherSettings::from(config),
        control_plane,
        secret,
    ))
}

/// Run the bridge until SIGINT/SIGTERM, then shut down gracefully.
pub async fn run(config: BridgeConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let dispatcher = Arc::new(build_dispatcher(&config)?);
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server = BridgeServer::new(&config.listener, dispatcher);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            // The accept loop only returns early on a fatal listener error.
            result??;
            return Ok(());
        }
        signal = wait_for_shutdown_signal() => {
            let signal = signal.map_err(StartupError::Signal)?;
            tracing::info!(signal, "Shutdown signal received");
        }
    }

    shutdown.trigger();
    server_task.await??;
    Ok(())
}
