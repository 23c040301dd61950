//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (after access log and rate-limit gate)
//!     → pool.rs (buffer body, start attempt 0)
//!     → round_robin.rs (pick next live backend)
//!     → backend.rs (forward to upstream)
//!     → on transport error: mark backend down, retry on another backend
//!     → 503 when nothing is alive, 502 when attempts run out
//! ```
//!
//! # Design Decisions
//! - Backend order is fixed at construction; only liveness mutates
//! - Liveness is one atomic flag per backend, never a pool-wide lock
//! - Strategy state is a single atomic cursor

use std::sync::Arc;

pub mod backend;
pub mod pool;
pub mod round_robin;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::{AddressError, Backend, BackendKind, ForwardError, HttpBackend, ProbeError};
pub use pool::{BackendPool, BackendStatus, MAX_RETRIES};
pub use round_robin::RoundRobin;

/// Selection strategy over an ordered set of backends.
pub trait LoadBalancer<B>: Send + Sync {
    /// Pick the next live backend, or `None` when every backend is down.
    fn next_server(&self, backends: &[Arc<B>]) -> Option<Arc<B>>;
}

/// Errors raised while building a [`BackendPool`].
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("invalid input parameters: {0}")]
    InvalidInput(&'static str),

    #[error("unsupported backend type: {0}")]
    UnsupportedType(String),

    #[error("invalid backend address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },
}
