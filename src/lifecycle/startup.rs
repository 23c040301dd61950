//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Build the backend pool and client repository
//! - Bind the listener and serve until a signal arrives
//!
//! # Design Decisions
//! - Fail fast: construction errors abort the process
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::load_balancer::PoolError;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to create backends pool: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the load balancer until SIGINT/SIGTERM, then drain and stop.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        match signals::wait_for_signal().await {
            Ok(signal) => {
                tracing::info!(signal, "Received signal, shutting down");
                trigger.trigger();
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot install signal handlers");
            }
        }
    });

    let result = server.run(listener, shutdown).await;
    signal_task.abort();

    result.map_err(StartupError::Serve)
}
