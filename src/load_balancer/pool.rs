//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered backend set and the selection strategy
//! - Dispatch requests with failover across backends
//! - Fan out health probes

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::http::response::ApiError;
use crate::http::X_REQUEST_ID;
use crate::load_balancer::{
    backend::{self, Backend, BackendKind, HttpBackend},
    LoadBalancer, PoolError,
};
use crate::observability::metrics;

/// Total attempts a single request gets before the pool gives up with 502.
pub const MAX_RETRIES: usize = 3;

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Liveness snapshot of one backend, as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub address: String,
    pub alive: bool,
}

/// Ordered set of backends plus the strategy that rotates through them.
pub struct BackendPool<B = HttpBackend> {
    backends: Vec<Arc<B>>,
    strategy: Box<dyn LoadBalancer<B>>,
    max_body_bytes: usize,
}

impl BackendPool<HttpBackend> {
    /// Build a pool of `kind` backends from raw addresses.
    ///
    /// Fails on an empty list, an unknown kind, or the first malformed address.
    pub fn new(
        strategy: Box<dyn LoadBalancer<HttpBackend>>,
        kind: &str,
        addresses: &[String],
    ) -> Result<Self, PoolError> {
        if addresses.is_empty() {
            return Err(PoolError::InvalidInput("empty backend address list"));
        }

        let backends = match kind.parse::<BackendKind>()? {
            BackendKind::Http => {
                let client = backend::http_client();
                addresses
                    .iter()
                    .map(|address| {
                        HttpBackend::new(address, client.clone())
                            .map(Arc::new)
                            .map_err(|source| PoolError::InvalidAddress {
                                address: address.clone(),
                                source,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Self::from_backends(strategy, backends)
    }
}

impl<B: Backend> BackendPool<B> {
    /// Build a pool from ready-made backends.
    pub fn from_backends(
        strategy: Box<dyn LoadBalancer<B>>,
        backends: Vec<Arc<B>>,
    ) -> Result<Self, PoolError> {
        if backends.is_empty() {
            return Err(PoolError::InvalidInput("empty backend list"));
        }

        tracing::info!(
            backends = ?backends.iter().map(|b| b.label()).collect::<Vec<_>>(),
            "Backend pool created"
        );

        Ok(Self {
            backends,
            strategy,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Cap on the request body buffered for replay across attempts.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn next(&self) -> Option<Arc<B>> {
        self.strategy.next_server(&self.backends)
    }

    pub fn backends(&self) -> &[Arc<B>] {
        &self.backends
    }

    pub fn statuses(&self) -> Vec<BackendStatus> {
        self.backends
            .iter()
            .map(|b| BackendStatus {
                address: b.label().to_string(),
                alive: b.is_alive(),
            })
            .collect()
    }

    /// Route one request to a live backend, failing over on transport errors.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let upstream = match UpstreamRequest::buffer(request, self.max_body_bytes).await {
            Ok(upstream) => upstream,
            Err(e) => return e.into_response(),
        };

        let mut attempt = 0;
        loop {
            let Some(backend) = self.next() else {
                tracing::error!(
                    request_id = %upstream.request_id(),
                    attempt,
                    "No live backend available"
                );
                return ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "service not available")
                    .into_response();
            };

            match backend.forward(upstream.build()).await {
                Ok(response) => {
                    tracing::debug!(
                        request_id = %upstream.request_id(),
                        backend = %backend.label(),
                        attempt,
                        status = response.status().as_u16(),
                        "Request forwarded"
                    );
                    return response;
                }
                Err(e) if !e.is_transport() => {
                    tracing::error!(
                        request_id = %upstream.request_id(),
                        backend = %backend.label(),
                        error = %e,
                        "Cannot build upstream request"
                    );
                    return ApiError::new(StatusCode::BAD_GATEWAY, "bad gateway").into_response();
                }
                Err(e) => {
                    tracing::warn!(
                        request_id = %upstream.request_id(),
                        backend = %backend.label(),
                        attempt,
                        error = %e,
                        "Upstream error, marking backend down"
                    );
                    backend.set_alive(false);
                    metrics::record_upstream_failure(backend.label());
                    metrics::record_backend_health(backend.label(), false);

                    if attempt + 1 >= MAX_RETRIES {
                        tracing::error!(
                            request_id = %upstream.request_id(),
                            attempts = attempt + 1,
                            "Retries exhausted"
                        );
                        return ApiError::new(StatusCode::BAD_GATEWAY, "too many retries")
                            .into_response();
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Probe every backend concurrently and apply each outcome independently.
    ///
    /// Returns once all probes finish, which is bounded by `timeout`.
    pub async fn health_check(&self, timeout: Duration) {
        let mut probes = JoinSet::new();

        for backend in &self.backends {
            let backend = Arc::clone(backend);
            probes.spawn(async move {
                let alive = match backend.check_health(timeout).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(backend = %backend.label(), error = %e, "Health check failed");
                        false
                    }
                };
                if alive != backend.is_alive() {
                    tracing::info!(backend = %backend.label(), alive, "Backend liveness changed");
                }
                backend.set_alive(alive);
                metrics::record_backend_health(backend.label(), alive);
            });
        }

        while let Some(result) = probes.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Health probe task failed");
            }
        }
    }
}

/// Buffered copy of an inbound request that can be replayed per attempt.
struct UpstreamRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl UpstreamRequest {
    async fn buffer(request: Request<Body>, max_body_bytes: usize) -> Result<Self, ApiError> {
        let declared = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > max_body_bytes) {
            return Err(ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
            ));
        }

        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (parts, body) = request.into_parts();
        // Bodies without Content-Length are only caught while reading.
        let body = match Limited::new(body, max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                return Err(ApiError::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "request body too large",
                ));
            }
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read request body");
                return Err(ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "failed to read request body",
                ));
            }
        };

        let mut headers = parts.headers;
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut headers, ip);
        }

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers,
            body,
        })
    }

    fn build(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        request
    }

    fn request_id(&self) -> &str {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let value = match headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert("x-forwarded-for", value);
    }
}
