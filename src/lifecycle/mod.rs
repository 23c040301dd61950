//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → metrics → pool + repository → bind → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain (bounded) → stop timers → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Background timers subscribe to the same coordinator as the server
//! - Shutdown has a deadline: remaining connections are dropped after it

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
