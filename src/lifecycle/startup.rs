//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the masking engine from validated configuration
//! - Install logging and, when enabled, the metrics endpoint
//! - Assemble the boundary layer, interceptor and propagator
//!
//! Must run inside a tokio runtime when metrics are enabled.

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use axum::http::header::InvalidHeaderName;
use metrics_exporter_prometheus::BuildError;

use crate::config::PaylogConfig;
use crate::http::boundary::{BoundarySettings, CorrelationLayer};
use crate::interceptor::Interceptor;
use crate::masking::{MaskingEngine, MaskingError};
use crate::observability::{self, metrics, LoggingError};
use crate::propagation::Propagator;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("masking rules: {0}")]
    Masking(#[from] MaskingError),

    #[error("correlation header: {0}")]
    Header(#[from] InvalidHeaderName),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] BuildError),
}

/// Everything a service needs to instrument its requests.
#[derive(Clone)]
pub struct Components {
    pub config: PaylogConfig,
    pub masker: Arc<MaskingEngine>,
    pub interceptor: Interceptor,
    pub boundary: CorrelationLayer,
    pub propagator: Propagator,
}

impl Components {
    /// Assemble without touching global state (no logging, no metrics).
    pub fn build(config: PaylogConfig) -> Result<Self, StartupError> {
        let masker = Arc::new(MaskingEngine::from_config(&config.masking)?);
        let interceptor = Interceptor::from_config(masker.clone(), &config.instrumentation);
        let boundary = CorrelationLayer::new(BoundarySettings::from_config(&config.correlation)?);
        let propagator = Propagator::from_config(&config.propagation);
        Ok(Self {
            config,
            masker,
            interceptor,
            boundary,
            propagator,
        })
    }
}

/// Build the components and install the global logging and metrics sinks.
pub fn initialize(config: PaylogConfig) -> Result<Components, StartupError> {
    let components = Components::build(config)?;
    let config = &components.config;

    observability::init(config, components.masker.clone())?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        masking_rules = components.masker.rules().len(),
        instrumentation = config.instrumentation.enabled,
        "paylog initialized"
    );
    Ok(components)
}
