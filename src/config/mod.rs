//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML or YAML, path from --config / CONFIG_PATH)
//!     → loader.rs (parse & deserialize, LB_* env overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigFormat};
pub use schema::{
    AdminConfig, BackendsConfig, Environment, HealthCheckConfig, ListenerConfig,
    ObservabilityConfig, ProxyConfig, RateLimitConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
