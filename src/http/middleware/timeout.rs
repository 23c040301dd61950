//! Request deadline.
//!
//! Bounds the whole handler, including every failover attempt. A request
//! that misses the deadline is answered with a JSON 504, and dropping the
//! inner future cancels any upstream call still in flight.

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::request_id;
use crate::http::response::ApiError;

pub const GATEWAY_TIMEOUT: &str = "gateway timeout";

pub async fn request_timeout(
    State(limit): State<Duration>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = request_id(&request).to_string();

    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(request_id = %request_id, limit = ?limit, "Request timed out");
            ApiError::new(StatusCode::GATEWAY_TIMEOUT, GATEWAY_TIMEOUT).into_response()
        }
    }
}
