//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! Every failure is collected so an operator sees them all at once.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.url) {
        Ok(url) if url.scheme() == "http" && url.host_str().is_some() => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.url",
            format!("'{}' must be an absolute http URL", url),
        )),
        Err(e) => errors.push(ValidationError::new(
            "upstream.url",
            format!("'{}' is not a URL: {}", config.upstream.url, e),
        )),
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.default_limit == 0 {
        errors.push(ValidationError::new("rate_limit.default_limit", "must be greater than 0"));
    }
    if rate_limit.privileged_limit == 0 {
        errors.push(ValidationError::new("rate_limit.privileged_limit", "must be greater than 0"));
    }
    if rate_limit.window_ms == 0 {
        errors.push(ValidationError::new("rate_limit.window_ms", "must be greater than 0"));
    }
    if rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be greater than 0"));
    }
    if rate_limit.privileged_origins.iter().any(|o| o.trim().is_empty()) {
        errors.push(ValidationError::new(
            "rate_limit.privileged_origins",
            "entries must not be empty",
        ));
    }

    let security = &config.security;
    if security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }
    let header_values = [
        ("security.content_type_options", &security.content_type_options),
        ("security.frame_options", &security.frame_options),
        ("security.xss_protection", &security.xss_protection),
        ("security.strict_transport_security", &security.strict_transport_security),
        ("security.content_security_policy", &security.content_security_policy),
        ("security.referrer_policy", &security.referrer_policy),
        ("security.permissions_policy", &security.permissions_policy),
    ];
    for (field, value) in header_values {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(field, "not a valid header value"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
