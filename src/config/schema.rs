//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for paylog.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PaylogConfig {
    /// Service identity stamped on every record.
    pub service: ServiceConfig,

    /// Listener for the demo service.
    pub listener: ListenerConfig,

    /// Sensitive-data masking.
    pub masking: MaskingConfig,

    /// Operation interceptor settings.
    pub instrumentation: InstrumentationConfig,

    /// Inbound correlation handling.
    pub correlation: CorrelationConfig,

    /// Outbound header propagation, per transport.
    pub propagation: PropagationConfig,

    /// Log output and metrics.
    pub observability: ObservabilityConfig,
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name (`service` field of every record).
    pub name: String,

    /// Deployment environment (`environment` field of every record).
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "unknown-service".to_string(),
            environment: "unknown".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Masking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Enable masking. When false every payload is logged verbatim.
    pub enabled: bool,

    /// Rules appended after the default catalog.
    pub extra_rules: Vec<ExtraRuleConfig>,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_rules: Vec::new(),
        }
    }
}

/// A user-supplied masking rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtraRuleConfig {
    /// Rule identifier for diagnostics.
    pub name: String,

    /// Detection regex.
    pub pattern: String,

    /// Replacement template (`${1}` refers to the first capture group).
    pub replacement: String,
}

/// Operation interceptor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Enable the interceptor. When false every wrapped operation is a pass-through.
    pub enabled: bool,

    /// Default performance threshold in milliseconds.
    pub performance_threshold_ms: u64,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            performance_threshold_ms: 1000,
        }
    }
}

/// Inbound correlation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Enable the boundary layer.
    pub enabled: bool,

    /// Primary correlation header, also used for the response echo.
    pub header_name: String,

    /// Fallback correlation header.
    pub fallback_header_name: String,

    /// Generate a correlation id when both headers are absent.
    pub generate_if_missing: bool,

    /// Resolve `client_ip`.
    pub include_client_ip: bool,

    /// Record `request_uri` and `request_method`.
    pub include_request_uri: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: "X-Correlation-ID".to_string(),
            fallback_header_name: "X-Request-ID".to_string(),
            generate_if_missing: true,
            include_client_ip: true,
            include_request_uri: true,
        }
    }
}

/// Outbound propagation toggles, one per transport kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Blocking reqwest client.
    pub blocking: bool,

    /// Async reqwest client.
    pub async_client: bool,

    /// Tower-based clients.
    pub tower_client: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            blocking: true,
            async_client: true,
            tower_client: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One structured JSON record per line.
    Json,
    /// Human-readable lines, masked before writing.
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format.
    pub format: LogFormat,

    /// Maximum number of entries in `exception.stack_trace`.
    pub max_stack_depth: usize,

    /// Audit file. Audit records go to stdout when unset.
    pub audit_path: Option<String>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            max_stack_depth: 50,
            audit_path: None,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: PaylogConfig = toml::from_str("").unwrap();
        assert!(config.masking.enabled);
        assert_eq!(config.instrumentation.performance_threshold_ms, 1000);
        assert_eq!(config.correlation.header_name, "X-Correlation-ID");
        assert_eq!(config.observability.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_sections() {
        let config: PaylogConfig = toml::from_str(
            r#"
            [service]
            name = "payments"
            environment = "prod"

            [propagation]
            blocking = false

            [[masking.extra_rules]]
            name = "contract"
            pattern = "CTR-\\d+"
            replacement = "CTR-***"
            "#,
        )
        .unwrap();
        assert_eq!(config.service.name, "payments");
        assert!(!config.propagation.blocking);
        assert!(config.propagation.async_client);
        assert_eq!(config.masking.extra_rules.len(), 1);
    }
}
