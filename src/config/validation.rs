//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that header values can be sent on the wire
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::RelayConfig;

/// Path reserved for the status endpoint.
pub const STATUS_PATH: &str = "/status";

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::new(
            "listener.max_concurrent_requests",
            "must be greater than zero",
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
    }

    let path = &config.relay.path;
    if !path.starts_with('/') || path.len() < 2 {
        errors.push(ValidationError::new(
            "relay.path",
            format!("'{path}' must start with '/' and name a route"),
        ));
    } else if path == STATUS_PATH {
        errors.push(ValidationError::new(
            "relay.path",
            format!("'{STATUS_PATH}' is reserved for the status endpoint"),
        ));
    }
    if config.relay.max_body_size == 0 {
        errors.push(ValidationError::new("relay.max_body_size", "must be greater than zero"));
    }

    let upstream = &config.upstream;
    if upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than zero"));
    }
    if upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "upstream.connect_timeout_secs",
            "must be greater than zero",
        ));
    }
    if HeaderValue::from_str(&upstream.accept).is_err() {
        errors.push(ValidationError::new("upstream.accept", "not a valid header value"));
    }
    if upstream.fallback_user_agent.is_empty()
        || HeaderValue::from_str(&upstream.fallback_user_agent).is_err()
    {
        errors.push(ValidationError::new(
            "upstream.fallback_user_agent",
            "not a valid header value",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    } else if upstream.timeout_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::new(
            "upstream.timeout_secs",
            format!(
                "must be shorter than timeouts.request_secs ({})",
                config.timeouts.request_secs
            ),
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
