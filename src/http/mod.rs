//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout)
//!     → middleware/access_log.rs (method, path, status, latency)
//!     → /clients, /backends → admin
//!     → anything else → security::rate_limit gate → load_balancer::pool
//!     → response.rs (JSON error bodies)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use response::{ApiError, ErrorBody};
pub use server::HttpServer;
