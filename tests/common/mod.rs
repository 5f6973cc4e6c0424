//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use paylog::masking::MaskingEngine;

/// A captured event with all its fields, `message` included.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn message(&self) -> &str {
        self.fields.get("message").map(String::as_str).unwrap_or_default()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

struct FieldVisitor(HashMap<String, String>);

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor(HashMap::new());
        event.record(&mut visitor);
        let captured = CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            fields: visitor.0,
        };
        self.events.lock().map(|mut events| events.push(captured)).ok();
    }
}

/// Handle for reading captured events.
#[derive(Clone, Default)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.message().starts_with(prefix))
            .collect()
    }

    pub fn audits(&self) -> Vec<serde_json::Value> {
        self.events()
            .iter()
            .filter(|e| e.target == paylog::interceptor::AUDIT_TARGET)
            .filter_map(|e| e.field("audit").and_then(|a| serde_json::from_str(a).ok()))
            .collect()
    }
}

/// Install a capturing subscriber for the current thread until the guard drops.
pub fn capture() -> (TestCapture, tracing::subscriber::DefaultGuard) {
    let capture = TestCapture::default();
    let layer = CaptureLayer {
        events: capture.events.clone(),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

pub fn masker() -> Arc<MaskingEngine> {
    Arc::new(MaskingEngine::with_defaults().unwrap())
}
