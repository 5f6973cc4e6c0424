//! Fixed-schema JSON rendering of log records.
//!
//! ```text
//! {"@timestamp":"2026-01-05T10:00:00.123Z","level":"INFO","logger":"paylog::interceptor",
//!  "thread":"tokio-runtime-worker","service":"payments","environment":"prod",
//!  "context":{"correlation_id":"...","operation":"SEPA_TRANSFER"},
//!  "message":"EXIT [SEPA_TRANSFER] time=12ms",
//!  "exception":{"class":"...","message":"...","stack_trace":["..."]}}
//! ```
//!
//! Context values, the message and the exception text are masked. Rendering
//! never fails: a record that cannot be encoded becomes a minimal error record.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::Level;

use crate::config::PaylogConfig;
use crate::context::RequestContext;
use crate::masking::MaskingEngine;

/// An event as seen by the log pipeline, before masking.
#[derive(Debug, Clone)]
pub struct RawLogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub logger: String,
    pub thread: String,
    pub message: String,
    pub exception: Option<ExceptionInfo>,
}

impl RawLogEvent {
    /// Event stamped now on the current thread.
    pub fn now(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            thread: current_thread_name(),
            message: message.into(),
            exception: None,
        }
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
}

pub(crate) fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}

/// Error descriptor; `stack_trace` is the `source()` chain, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub class: String,
    pub message: Option<String>,
    pub stack_trace: Vec<String>,
}

impl ExceptionInfo {
    pub fn from_error(class: impl Into<String>, error: &(dyn std::error::Error + 'static)) -> Self {
        let stack_trace = std::iter::successors(error.source(), |e| e.source())
            .map(ToString::to_string)
            .collect();
        Self {
            class: class.into(),
            message: Some(error.to_string()),
            stack_trace,
        }
    }
}

#[derive(Serialize)]
struct LogRecord<'a> {
    #[serde(rename = "@timestamp")]
    timestamp: String,
    level: &'a str,
    logger: &'a str,
    thread: &'a str,
    service: &'a str,
    environment: &'a str,
    #[serde(skip_serializing_if = "RequestContext::is_empty")]
    context: RequestContext,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<ExceptionRecord<'a>>,
}

#[derive(Serialize)]
struct ExceptionRecord<'a> {
    class: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stack_trace: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StructuredLogSerializer {
    service: String,
    environment: String,
    masker: Arc<MaskingEngine>,
    max_stack_depth: usize,
}

impl StructuredLogSerializer {
    pub fn new(
        service: impl Into<String>,
        environment: impl Into<String>,
        masker: Arc<MaskingEngine>,
        max_stack_depth: usize,
    ) -> Self {
        Self {
            service: service.into(),
            environment: environment.into(),
            masker,
            max_stack_depth,
        }
    }

    pub fn from_config(config: &PaylogConfig, masker: Arc<MaskingEngine>) -> Self {
        Self::new(
            config.service.name.clone(),
            config.service.environment.clone(),
            masker,
            config.observability.max_stack_depth,
        )
    }

    /// One JSON line, without the trailing newline.
    pub fn render(&self, event: &RawLogEvent, ctx: &RequestContext) -> String {
        let masker = &self.masker;
        let context = ctx
            .iter()
            .fold(RequestContext::new(), |acc, (key, value)| acc.with(key, masker.mask(value)));
        let message = masker.mask(&event.message);

        let exception = event.exception.as_ref().map(|ex| ExceptionRecord {
            class: &ex.class,
            message: masker.mask_opt(ex.message.as_deref()),
            stack_trace: ex
                .stack_trace
                .iter()
                .take(self.max_stack_depth)
                .map(|frame| masker.mask(frame))
                .collect(),
        });

        let record = LogRecord {
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            level: event.level.as_str(),
            logger: &event.logger,
            thread: &event.thread,
            service: &self.service,
            environment: &self.environment,
            context,
            message,
            exception,
        };
        encode(&record, &record.message)
    }
}

/// Encode `record`, or a minimal error record carrying the (masked) message.
fn encode<T: Serialize>(record: &T, masked_message: &str) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| {
        serde_json::json!({
            "error": "JSON serialization failed",
            "message": masked_message,
        })
        .to_string()
    })
}
