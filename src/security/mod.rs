//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request bound for the load balancer:
//!     → rate_limit.rs (one token per request, keyed by caller IP)
//!     → 429 on empty bucket, otherwise pass to the backend pool
//! ```
//!
//! # Design Decisions
//! - Identity comes from the transport address, never from headers
//! - Rejections short-circuit; the pool never sees them

pub mod rate_limit;

pub use rate_limit::rate_limit_middleware;
