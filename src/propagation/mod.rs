//! Outbound context propagation subsystem.
//!
//! # Data Flow
//! ```text
//! blocking reqwest:  builder.with_context()          reads the store at dispatch
//! async reqwest:     ContextSnapshot::capture()      at scheduling time
//!                    → builder.with_snapshot(&snap)
//! tower clients:     PropagationLayer                captures in Service::call
//!
//! all of them → inject(ctx, headers)
//!     correlation_id → X-Correlation-ID
//!     transaction_id → X-Transaction-ID
//!     user_id        → X-User-ID
//! ```
//!
//! # Design Decisions
//! - One header mapping shared by every transport
//! - Absent fields and values that are not valid header text are skipped
//! - Async transports only ever see a snapshot, never the live store

pub mod async_client;
pub mod blocking;
pub mod client_layer;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::PropagationConfig;
use crate::context::{ContextKey, ContextSnapshot, RequestContext};
use crate::http::headers::{X_CORRELATION_ID, X_TRANSACTION_ID, X_USER_ID};

pub use async_client::AsyncPropagation;
pub use blocking::BlockingPropagation;
pub use client_layer::{PropagationLayer, PropagationService};

const PROPAGATED: [(ContextKey, HeaderName); 3] = [
    (ContextKey::CorrelationId, X_CORRELATION_ID),
    (ContextKey::TransactionId, X_TRANSACTION_ID),
    (ContextKey::UserId, X_USER_ID),
];

/// Copy the propagated fields of `ctx` into `headers`. Returns how many were written.
pub fn inject(ctx: &RequestContext, headers: &mut HeaderMap) -> usize {
    let mut written = 0;
    for (key, name) in PROPAGATED {
        let Some(value) = ctx.get(key) else {
            continue;
        };
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name, value);
                written += 1;
            }
            Err(_) => tracing::debug!(field = %key, "Skipping context field that is not a valid header value"),
        }
    }
    written
}

/// Per-transport switches from `[propagation]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propagator {
    blocking: bool,
    async_client: bool,
    tower_client: bool,
}

impl Default for Propagator {
    fn default() -> Self {
        Self::from_config(&PropagationConfig::default())
    }
}

impl Propagator {
    pub fn from_config(config: &PropagationConfig) -> Self {
        Self {
            blocking: config.blocking,
            async_client: config.async_client,
            tower_client: config.tower_client,
        }
    }

    pub fn blocking(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        if self.blocking {
            builder.with_context()
        } else {
            builder
        }
    }

    pub fn async_request(
        &self,
        builder: reqwest::RequestBuilder,
        snapshot: &ContextSnapshot,
    ) -> reqwest::RequestBuilder {
        if self.async_client {
            builder.with_snapshot(snapshot)
        } else {
            builder
        }
    }

    pub fn layer(&self) -> PropagationLayer {
        if self.tower_client {
            PropagationLayer::new()
        } else {
            PropagationLayer::disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_copies_present_fields_only() {
        let ctx = RequestContext::new()
            .with(ContextKey::CorrelationId, "abc-123")
            .with(ContextKey::UserId, "u-1")
            .with(ContextKey::ClientIp, "10.0.0.1");
        let mut headers = HeaderMap::new();
        assert_eq!(inject(&ctx, &mut headers), 2);
        assert_eq!(headers["x-correlation-id"], "abc-123");
        assert_eq!(headers["x-user-id"], "u-1");
        assert!(headers.get("x-transaction-id").is_none());
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_inject_skips_invalid_values() {
        let ctx = RequestContext::new()
            .with(ContextKey::CorrelationId, "line\nbreak")
            .with(ContextKey::TransactionId, "tx-1");
        let mut headers = HeaderMap::new();
        assert_eq!(inject(&ctx, &mut headers), 1);
        assert_eq!(headers["x-transaction-id"], "tx-1");
    }

    #[test]
    fn test_inject_overwrites_existing_header() {
        let ctx = RequestContext::new().with(ContextKey::CorrelationId, "fresh");
        let mut headers = HeaderMap::new();
        headers.insert("x-correlation-id", HeaderValue::from_static("stale"));
        inject(&ctx, &mut headers);
        assert_eq!(headers["x-correlation-id"], "fresh");
    }

    #[test]
    fn test_disabled_transport_is_untouched() {
        let propagator = Propagator::from_config(&PropagationConfig {
            async_client: false,
            ..PropagationConfig::default()
        });
        let snapshot = ContextSnapshot::from(RequestContext::new().with(ContextKey::CorrelationId, "abc-123"));
        let request = propagator
            .async_request(reqwest::Client::new().get("http://localhost/"), &snapshot)
            .build()
            .unwrap();
        assert!(request.headers().get("x-correlation-id").is_none());
    }
}
