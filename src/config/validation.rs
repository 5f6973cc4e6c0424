//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Header names must be valid HTTP header names
//! - Extra masking rules must compile
//! - Value ranges (threshold > 0, stack depth > 0, addresses parse)
//!
//! Returns every error found, not just the first.

use std::net::SocketAddr;

use axum::http::HeaderName;
use tracing_subscriber::EnvFilter;

use crate::config::schema::PaylogConfig;
use crate::masking::MaskingRule;

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a parsed config.
pub fn validate_config(config: &PaylogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("correlation.header_name", &config.correlation.header_name),
        ("correlation.fallback_header_name", &config.correlation.fallback_header_name),
    ] {
        if HeaderName::from_bytes(value.as_bytes()).is_err() {
            errors.push(ValidationError::new(field, format!("`{value}` is not a valid header name")));
        }
    }

    for rule in &config.masking.extra_rules {
        if let Err(e) = MaskingRule::new(rule.name.clone(), &rule.pattern, rule.replacement.clone()) {
            errors.push(ValidationError::new("masking.extra_rules", e.to_string()));
        }
    }

    if config.instrumentation.performance_threshold_ms == 0 {
        errors.push(ValidationError::new(
            "instrumentation.performance_threshold_ms",
            "must be greater than 0",
        ));
    }

    if config.observability.max_stack_depth == 0 {
        errors.push(ValidationError::new("observability.max_stack_depth", "must be greater than 0"));
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("`{}` is not a valid filter", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
