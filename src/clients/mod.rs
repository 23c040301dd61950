//! Per-client admission state.
//!
//! # Data Flow
//! ```text
//! Rate-limit gate ──consume(ip, 1)──▶ repository.rs ──▶ bucket.rs (allow)
//! Management API ──add/update/delete──▶ repository.rs
//! replenish.rs (timer) ──replenish()──▶ repository.rs ──▶ bucket.rs (refill)
//! ```
//!
//! # Design Decisions
//! - One map-wide read/write lock; every mutation takes it exclusively
//! - Unknown callers are provisioned with repository defaults on first touch
//! - State is in memory only

pub mod bucket;
pub mod replenish;
pub mod repository;

pub use bucket::{Client, TokenBucket};
pub use replenish::Replenisher;
pub use repository::{ClientRepository, MemoryRepository, RepoError};
