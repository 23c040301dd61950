//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Backend URLs are checked by the pool itself at construction

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("at least one backend required")]
    NoBackends,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid {field} {value:?}")]
    Address { field: &'static str, value: String },

    #[error("admin.api_key must not be empty when set")]
    EmptyApiKey,
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.addresses.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::Zero("health_check.interval_secs"));
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::Zero("health_check.timeout_secs"));
        }
    }

    if config.rate_limit.enabled && config.rate_limit.replenish_interval_ms == 0 {
        errors.push(ValidationError::Zero("rate_limit.replenish_interval_ms"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if config
        .admin
        .api_key
        .as_deref()
        .is_some_and(|key| key.trim().is_empty())
    {
        errors.push(ValidationError::EmptyApiKey);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.backends.addresses = vec!["http://127.0.0.1:3000".into()];
        config
    }

    #[test]
    fn test_defaults_with_backend_are_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.health_check.interval_secs = 0;
        config.admin.api_key = Some("  ".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NoBackends,
                ValidationError::Address {
                    field: "listener.bind_address",
                    value: "nowhere".into()
                },
                ValidationError::Zero("health_check.interval_secs"),
                ValidationError::EmptyApiKey,
            ]
        );
    }

    #[test]
    fn test_disabled_features_skip_checks() {
        let mut config = valid();
        config.health_check.enabled = false;
        config.health_check.interval_secs = 0;
        config.rate_limit.enabled = false;
        config.rate_limit.replenish_interval_ms = 0;
        assert_eq!(validate_config(&config), Ok(()));
    }
}
