//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active checks (active.rs):
//!     Periodic timer
//!     → BackendPool::health_check (one TCP probe per backend, concurrently)
//!     → each backend's liveness flag
//!
//! Passive marking (load_balancer::pool):
//!     Transport error while forwarding
//!     → backend marked down until a probe succeeds
//! ```
//!
//! # Design Decisions
//! - Liveness is per backend, never per pool
//! - Only the active monitor brings a backend back
//! - Probe failures are logged, never surfaced to callers

pub mod active;

pub use active::HealthMonitor;
