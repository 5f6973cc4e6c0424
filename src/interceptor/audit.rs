//! Audit trail records.
//!
//! Audit records go to the `audit` tracing target, which the logging layer
//! routes to its own long-retention writer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::{self, ContextKey};

pub const AUDIT_TARGET: &str = "audit";
pub const AUDIT_TYPE: &str = "PAYMENT_OPERATION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Success,
    Failure,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Success => "SUCCESS",
            AuditStatus::Failure => "FAILURE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_type: String,
    pub timestamp: String,
    pub operation: String,
    pub operation_id: String,
    pub status: AuditStatus,
    pub duration_ms: u64,
    pub correlation_id: Option<String>,
    pub user_id: Option<String>,
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

impl AuditRecord {
    /// Record stamped now, with identity fields read from the current context.
    pub fn new(operation: &str, operation_id: &str, status: AuditStatus, elapsed: Duration) -> Self {
        Self {
            audit_type: AUDIT_TYPE.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            operation: operation.to_string(),
            operation_id: operation_id.to_string(),
            status,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            correlation_id: context::get(ContextKey::CorrelationId),
            user_id: context::get(ContextKey::UserId),
            client_ip: context::get(ContextKey::ClientIp),
            error_type: None,
            error_message: None,
        }
    }

    /// Attach an already-masked error description.
    pub fn with_error(mut self, error_type: String, error_message: String) -> Self {
        self.error_type = Some(error_type);
        self.error_message = Some(error_message);
        self
    }

    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => tracing::info!(
                target: AUDIT_TARGET,
                audit = %json,
                status = self.status.as_str(),
                "AUDIT"
            ),
            Err(e) => tracing::warn!(
                operation = %self.operation,
                error = %e,
                "Failed to serialize audit record"
            ),
        }
    }
}
