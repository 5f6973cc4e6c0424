//! Records for calls to downstream systems.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::context::{self, ContextKey};
use crate::masking::MaskingEngine;
use crate::steps::masked_json;

/// Kind of downstream system; decides the record prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalKind {
    /// HTTP API, prefixed `[API]`.
    Api,
    /// Mainframe transaction, prefixed with the transaction name.
    Mainframe,
}

/// Context, request, response and summary records of one downstream call.
#[derive(Debug, Clone)]
pub struct ExternalCall {
    masker: Arc<MaskingEngine>,
    kind: ExternalKind,
    system: String,
}

impl ExternalCall {
    pub fn api(masker: Arc<MaskingEngine>, service: impl Into<String>) -> Self {
        Self {
            masker,
            kind: ExternalKind::Api,
            system: service.into(),
        }
    }

    pub fn mainframe(masker: Arc<MaskingEngine>, transaction: impl Into<String>) -> Self {
        Self {
            masker,
            kind: ExternalKind::Mainframe,
            system: transaction.into(),
        }
    }

    fn label(&self) -> &str {
        match self.kind {
            ExternalKind::Api => "API",
            ExternalKind::Mainframe => &self.system,
        }
    }

    /// Identity of the call, read from the current request context.
    pub fn context(&self, operation: &str) {
        let correlation_id = context::get(ContextKey::CorrelationId).unwrap_or_default();
        let user_id = context::get(ContextKey::UserId).unwrap_or_default();
        tracing::info!(
            step = "external",
            "[{}] Context: system={}, operation={}, correlation_id={}, user_id={}",
            self.label(),
            self.system,
            operation,
            correlation_id,
            self.masker.mask(&user_id)
        );
    }

    /// `target` is `METHOD url` for APIs, the input area name for transactions.
    pub fn request<T: Serialize + ?Sized>(&self, target: &str, body: &T) {
        tracing::info!(
            step = "external",
            "[{}][{}] REQUEST {}",
            self.label(),
            target,
            masked_json(&self.masker, body)
        );
    }

    pub fn response<T: Serialize + ?Sized>(&self, target: &str, status: impl Display, body: &T) {
        tracing::info!(
            step = "external",
            "[{}][{}] RESPONSE {} {}",
            self.label(),
            target,
            status,
            masked_json(&self.masker, body)
        );
    }

    /// Outcome summary; `status` is an HTTP status or a transaction return code.
    pub fn summary(&self, status: impl Display, elapsed: Duration, error: Option<&str>) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match error {
            Some(error) => tracing::info!(
                step = "external",
                duration_ms = ms,
                "[{}] Summary: system={}, status={}, elapsed_ms={}, error={}",
                self.label(),
                self.system,
                status,
                ms,
                self.masker.mask(error)
            ),
            None => tracing::info!(
                step = "external",
                duration_ms = ms,
                "[{}] Summary: system={}, status={}, elapsed_ms={}",
                self.label(),
                self.system,
                status,
                ms
            ),
        }
    }

    pub fn error(&self, target: &str, error: &str) {
        tracing::error!(
            step = "external",
            "[{}][{}] ERROR {}",
            self.label(),
            target,
            self.masker.mask(error)
        );
    }
}
