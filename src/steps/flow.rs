//! Controller, validation and database step loggers.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::masking::MaskingEngine;
use crate::steps::masked_json;

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Start, body and end records of one controller invocation.
#[derive(Debug, Clone)]
pub struct ControllerFlow {
    masker: Arc<MaskingEngine>,
    method: String,
    url: String,
    handler: String,
}

impl ControllerFlow {
    pub fn new(
        masker: Arc<MaskingEngine>,
        method: impl Into<String>,
        url: impl Into<String>,
        handler: impl Into<String>,
    ) -> Self {
        Self {
            masker,
            method: method.into(),
            url: url.into(),
            handler: handler.into(),
        }
    }

    pub fn start(&self) {
        tracing::info!(step = "controller", "{} {} {} Start", self.method, self.url, self.handler);
    }

    pub fn request<T: Serialize + ?Sized>(&self, body: &T) {
        tracing::info!(step = "controller", "Request: {}", masked_json(&self.masker, body));
    }

    pub fn response<T: Serialize + ?Sized>(&self, body: &T) {
        tracing::info!(step = "controller", "Response: {}", masked_json(&self.masker, body));
    }

    pub fn end(&self) {
        tracing::info!(step = "controller", "{} {} {} End", self.method, self.url, self.handler);
    }

    pub fn end_request<T: Serialize + ?Sized>(&self, body: &T) {
        tracing::info!(step = "controller", "END Request: {}", masked_json(&self.masker, body));
    }

    pub fn error(&self, message: &str) {
        tracing::error!(
            step = "controller",
            "{} {} {} Error: {}",
            self.method,
            self.url,
            self.handler,
            self.masker.mask(message)
        );
    }
}

/// Outcome records of a named validation.
#[derive(Debug, Clone)]
pub struct ValidationStep {
    masker: Arc<MaskingEngine>,
    name: String,
}

impl ValidationStep {
    pub fn new(masker: Arc<MaskingEngine>, name: impl Into<String>) -> Self {
        Self {
            masker,
            name: name.into(),
        }
    }

    pub fn start(&self) {
        tracing::info!(step = "validation", "Validation {} Start", self.name);
    }

    pub fn success(&self) {
        tracing::info!(step = "validation", "Validation {} Success", self.name);
    }

    pub fn failed(&self, reason: &str) {
        tracing::warn!(
            step = "validation",
            "Validation {} Failed: {}",
            self.name,
            self.masker.mask(reason)
        );
    }
}

/// Database operation records.
#[derive(Debug, Clone)]
pub struct DatabaseStep {
    masker: Arc<MaskingEngine>,
}

impl DatabaseStep {
    pub fn new(masker: Arc<MaskingEngine>) -> Self {
        Self { masker }
    }

    pub fn start<P: Serialize + ?Sized>(&self, operation: &str, params: Option<&P>) {
        match params {
            Some(params) => tracing::info!(
                step = "database",
                "[DB] {} params={}",
                operation,
                masked_json(&self.masker, params)
            ),
            None => tracing::info!(step = "database", "[DB] {}", operation),
        }
    }

    pub fn success<T: Serialize + ?Sized>(&self, operation: &str, elapsed: Duration, result: &T) {
        tracing::info!(
            step = "database",
            duration_ms = millis(elapsed),
            "[DB] {} Success (time={}ms) result={}",
            operation,
            millis(elapsed),
            masked_json(&self.masker, result)
        );
    }

    pub fn success_rows(&self, operation: &str, elapsed: Duration, rows: u64) {
        tracing::info!(
            step = "database",
            duration_ms = millis(elapsed),
            rows,
            "[DB] {} Success (time={}ms) rowCount={}",
            operation,
            millis(elapsed),
            rows
        );
    }

    pub fn failed(&self, operation: &str, elapsed: Duration, error: &str) {
        tracing::error!(
            step = "database",
            duration_ms = millis(elapsed),
            "[DB] {} Failed (time={}ms): {}",
            operation,
            millis(elapsed),
            self.masker.mask(error)
        );
    }
}
