//! Access logging.
//!
//! Records one structured line per request after the inner handler has
//! produced its response, so the logged status is whatever the caller gets.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::observability::metrics;

pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(&request).to_string();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let response = next.run(request).await;
    let status = response.status();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        client_ip = %client_ip,
        user_agent = %user_agent,
        status = status.as_u16(),
        duration = ?start.elapsed(),
        "New request"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);

    response
}
