//! Structured logging.
//!
//! JSON lines on stdout. `dev` logs at debug, `prod` at info; `RUST_LOG`
//! wins over `observability.log_level`, which wins over the environment.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Environment, ObservabilityConfig};

pub fn default_filter(env: Environment) -> &'static str {
    match env {
        Environment::Dev => "lb_proxy=debug,tower_http=debug",
        Environment::Prod => "lb_proxy=info,tower_http=info",
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(env: Environment, config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = config
            .log_level
            .as_deref()
            .unwrap_or_else(|| default_filter(env));
        EnvFilter::new(directives)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
        .init();
}
