//! Rate-limit gate.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::clients::ClientRepository;
use crate::http::response::ApiError;
use crate::observability::metrics;

pub const RATE_LIMIT_EXCEEDED: &str = "rate limit exceeded";

/// Admit the request if its caller still has a token, otherwise answer 429.
pub async fn rate_limit_middleware(
    State(repo): State<Arc<dyn ClientRepository>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(client_id) = client_identity(&request) else {
        tracing::warn!("Cannot determine client IP");
        return ApiError::bad_request("cannot determine client IP").into_response();
    };

    if repo.consume(&client_id, 1) {
        tracing::debug!(client = %client_id, "Token consumed");
        next.run(request).await
    } else {
        tracing::info!(client = %client_id, "Rate limit exceeded");
        metrics::record_rate_limited();
        ApiError::new(StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_EXCEEDED).into_response()
    }
}

/// Caller identity: the peer IP without the port.
pub fn client_identity(request: &Request<Body>) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
