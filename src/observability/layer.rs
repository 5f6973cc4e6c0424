//! `tracing_subscriber` layer writing structured JSON lines.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::context;
use crate::interceptor::AUDIT_TARGET;
use crate::observability::serializer::{current_thread_name, ExceptionInfo, RawLogEvent, StructuredLogSerializer};

/// Renders every event through [`StructuredLogSerializer`] with the current
/// request context. Events on the `audit` target bypass the serializer and
/// their `audit` field is written as-is to the audit writer.
pub struct StructuredJsonLayer<W, A> {
    serializer: StructuredLogSerializer,
    writer: W,
    audit_writer: A,
}

impl<W, A> StructuredJsonLayer<W, A> {
    pub fn new(serializer: StructuredLogSerializer, writer: W, audit_writer: A) -> Self {
        Self {
            serializer,
            writer,
            audit_writer,
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: HashMap<&'static str, String>,
    error: Option<ExceptionInfo>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name(), value.to_string());
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.error = Some(ExceptionInfo::from_error(String::new(), value));
        self.fields.insert(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.insert(field.name(), format!("{value:?}"));
        }
    }
}

impl EventVisitor {
    fn exception(&mut self) -> Option<ExceptionInfo> {
        let mut exception = self.error.take()?;
        exception.class = self
            .fields
            .remove("error_type")
            .unwrap_or_else(|| "Error".to_string());
        Some(exception)
    }
}

fn write_line(mut writer: impl Write, line: &str) {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    // A broken sink must not take the caller down.
    let _ = writer.write_all(buf.as_bytes());
}

impl<S, W, A> Layer<S> for StructuredJsonLayer<W, A>
where
    S: Subscriber,
    W: for<'w> MakeWriter<'w> + 'static,
    A: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        if metadata.target() == AUDIT_TARGET {
            if let Some(audit) = visitor.fields.get("audit") {
                write_line(self.audit_writer.make_writer_for(metadata), audit);
            }
            return;
        }

        let raw = RawLogEvent {
            timestamp: chrono::Utc::now(),
            level: *metadata.level(),
            logger: metadata.target().to_string(),
            thread: current_thread_name(),
            exception: visitor.exception(),
            message: visitor.message.unwrap_or_default(),
        };
        let line = self.serializer.render(&raw, &context::current());
        write_line(self.writer.make_writer_for(metadata), &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextKey, RequestContext};
    use crate::masking::MaskingEngine;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes).unwrap().lines().map(str::to_string).collect()
        }
    }

    fn subscriber(logs: &Buffer, audit: &Buffer) -> impl Subscriber + Send + Sync {
        let serializer = StructuredLogSerializer::new(
            "payments",
            "test",
            Arc::new(MaskingEngine::with_defaults().unwrap()),
            50,
        );
        let (logs, audit) = (logs.clone(), audit.clone());
        tracing_subscriber::registry().with(StructuredJsonLayer::new(
            serializer,
            move || logs.clone(),
            move || audit.clone(),
        ))
    }

    #[derive(Debug, thiserror::Error)]
    #[error("upstream said cvv 123 invalid")]
    struct Upstream(#[source] std::io::Error);

    #[test]
    fn test_event_rendered_with_context() {
        let (logs, audit) = (Buffer::default(), Buffer::default());
        tracing::subscriber::with_default(subscriber(&logs, &audit), || {
            let ctx = RequestContext::new().with(ContextKey::CorrelationId, "c-77");
            context::sync_scope(ctx, || {
                tracing::info!(target: "paylog::test", "paid with 4532015112345678");
            });
        });

        let lines = logs.lines();
        assert_eq!(lines.len(), 1);
        let json: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(json["message"], "paid with 453201******5678");
        assert_eq!(json["context"]["correlation_id"], "c-77");
        assert_eq!(json["logger"], "paylog::test");
        assert!(audit.lines().is_empty());
    }

    #[test]
    fn test_error_field_becomes_exception() {
        let (logs, audit) = (Buffer::default(), Buffer::default());
        let error = Upstream(std::io::Error::other("socket closed"));
        tracing::subscriber::with_default(subscriber(&logs, &audit), || {
            tracing::error!(
                error_type = "Upstream",
                error = &error as &(dyn std::error::Error + 'static),
                "call failed"
            );
        });

        let json: Value = serde_json::from_str(&logs.lines()[0]).unwrap();
        assert_eq!(json["exception"]["class"], "Upstream");
        assert_eq!(json["exception"]["message"], "upstream said cvv *** invalid");
        assert_eq!(json["exception"]["stack_trace"][0], "socket closed");
    }

    #[test]
    fn test_audit_target_goes_to_audit_writer() {
        let (logs, audit) = (Buffer::default(), Buffer::default());
        tracing::subscriber::with_default(subscriber(&logs, &audit), || {
            tracing::info!(target: "audit", audit = r#"{"status":"SUCCESS"}"#, "AUDIT");
        });

        assert!(logs.lines().is_empty());
        assert_eq!(audit.lines(), vec![r#"{"status":"SUCCESS"}"#.to_string()]);
    }
}
