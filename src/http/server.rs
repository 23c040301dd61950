//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: management routes plus the load-balanced fallback
//! - Wire up middleware (request ID, access log, timeout, rate limit)
//! - Spawn the health monitor and the token replenisher
//! - Serve until shutdown, then drain within the grace period
//!
//! # Data Flow
//! ```text
//! request ─▶ request id ─▶ access log ─▶ timeout ─┬─▶ /clients, /backends (admin)
//!                                                 └─▶ rate limit ─▶ BackendPool::dispatch
//! ```

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::admin::{self, AdminState};
use crate::clients::{ClientRepository, MemoryRepository, Replenisher};
use crate::config::ProxyConfig;
use crate::health::HealthMonitor;
use crate::http::middleware::{access_log, request_timeout};
use crate::http::request::UuidRequestId;
use crate::lifecycle::{shutdown::signalled, Shutdown};
use crate::load_balancer::{Backend, BackendPool, PoolError, RoundRobin};
use crate::security::rate_limit_middleware;

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<BackendPool>,
    repo: Arc<dyn ClientRepository>,
}

impl HttpServer {
    /// Build the backend pool, the client repository and the router.
    pub fn new(config: ProxyConfig) -> Result<Self, PoolError> {
        let pool = BackendPool::new(
            Box::new(RoundRobin::new()),
            &config.backends.kind,
            &config.backends.addresses,
        )?
        .with_max_body_bytes(config.listener.max_body_bytes);
        let pool = Arc::new(pool);

        let repo: Arc<dyn ClientRepository> = Arc::new(MemoryRepository::new(
            config.rate_limit.default_capacity,
            config.rate_limit.default_rate,
        ));

        let router = build_router(&config, pool.clone(), repo.clone());
        Ok(Self {
            router,
            config,
            pool,
            repo,
        })
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// In-flight requests get `timeouts.shutdown_grace_secs` to finish; after
    /// that the server returns and open connections are dropped.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut tasks = JoinSet::new();

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(
                self.pool.clone(),
                self.config.health_check.interval(),
                self.config.health_check.timeout(),
            );
            tasks.spawn(monitor.run(shutdown.subscribe()));
        }

        if self.config.rate_limit.enabled {
            let replenisher = Replenisher::new(
                self.repo.clone(),
                self.config.rate_limit.replenish_interval(),
            );
            tasks.spawn(replenisher.run(shutdown.subscribe()));
        }

        let grace = self.config.timeouts.shutdown_grace();
        let mut drain = shutdown.subscribe();

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(signalled(shutdown.subscribe()))
            .into_future();

        let result = tokio::select! {
            result = serve => result,
            _ = async {
                let _ = drain.recv().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace = ?grace, "Grace period elapsed, dropping open connections");
                Ok(())
            }
        };

        // The server may also stop on its own (listener error).
        shutdown.trigger();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Background task failed");
            }
        }

        tracing::info!("HTTP server stopped");
        result
    }
}

/// Assemble the full application router around `pool` and `repo`.
pub fn build_router<B: Backend>(
    config: &ProxyConfig,
    pool: Arc<BackendPool<B>>,
    repo: Arc<dyn ClientRepository>,
) -> Router {
    let state = AdminState {
        clients: repo.clone(),
        backends: pool.clone(),
    };

    admin::setup_admin_router(state, config.admin.api_key.clone())
        .fallback_service(load_balancer_router(config, pool, repo))
        .layer(middleware::from_fn_with_state(
            config.timeouts.request(),
            request_timeout,
        ))
        .layer(middleware::from_fn(access_log))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}

fn load_balancer_router<B: Backend>(
    config: &ProxyConfig,
    pool: Arc<BackendPool<B>>,
    repo: Arc<dyn ClientRepository>,
) -> Router {
    let router = Router::new().fallback(proxy_handler::<B>).with_state(pool);

    if config.rate_limit.enabled {
        router.layer(middleware::from_fn_with_state(repo, rate_limit_middleware))
    } else {
        router
    }
}

async fn proxy_handler<B: Backend>(
    State(pool): State<Arc<BackendPool<B>>>,
    request: Request<Body>,
) -> Response {
    pool.dispatch(request).await
}
