//! Per-operation instrumentation options.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::interceptor::TARGET;

/// Levels available for entry and exit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
}

impl LogLevel {
    pub fn as_tracing(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
        }
    }

    /// Whether an interceptor record at this level would be recorded.
    pub fn enabled(self) -> bool {
        match self {
            LogLevel::Trace => tracing::enabled!(target: TARGET, Level::TRACE),
            LogLevel::Debug => tracing::enabled!(target: TARGET, Level::DEBUG),
            LogLevel::Info => tracing::enabled!(target: TARGET, Level::INFO),
            LogLevel::Warn => tracing::enabled!(target: TARGET, Level::WARN),
        }
    }
}

/// How one wrapped operation is instrumented.
///
/// Built once at setup time and handed to
/// [`Interceptor::wrap`](crate::interceptor::Interceptor::wrap).
///
/// ```
/// use std::time::Duration;
/// use paylog::interceptor::OperationOptions;
///
/// let opts = OperationOptions::new("execute_transfer")
///     .label("SEPA_TRANSFER")
///     .audit(true)
///     .threshold(Duration::from_millis(500));
/// assert_eq!(opts.name(), "SEPA_TRANSFER");
/// ```
#[derive(Debug, Clone)]
pub struct OperationOptions {
    name: String,
    log_params: bool,
    log_result: bool,
    audit: bool,
    threshold: Option<Duration>,
    entry_level: LogLevel,
    exit_level: LogLevel,
    skip: bool,
}

impl OperationOptions {
    /// Options for the operation identified by `ident`; its name in records
    /// is the identifier upper-cased unless a [`label`](Self::label) is set.
    pub fn new(ident: &str) -> Self {
        Self {
            name: ident.to_uppercase(),
            log_params: true,
            log_result: true,
            audit: false,
            threshold: None,
            entry_level: LogLevel::Info,
            exit_level: LogLevel::Info,
            skip: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !label.trim().is_empty() {
            self.name = label;
        }
        self
    }

    pub fn log_params(mut self, enabled: bool) -> Self {
        self.log_params = enabled;
        self
    }

    pub fn log_result(mut self, enabled: bool) -> Self {
        self.log_result = enabled;
        self
    }

    pub fn audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    /// Override the process-wide slow-call threshold.
    pub fn threshold(mut self, threshold: Duration) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn entry_level(mut self, level: LogLevel) -> Self {
        self.entry_level = level;
        self
    }

    pub fn exit_level(mut self, level: LogLevel) -> Self {
        self.exit_level = level;
        self
    }

    /// Opt out: the operation runs as a plain pass-through.
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logs_params(&self) -> bool {
        self.log_params
    }

    pub fn logs_result(&self) -> bool {
        self.log_result
    }

    pub fn audited(&self) -> bool {
        self.audit
    }

    pub fn threshold_override(&self) -> Option<Duration> {
        self.threshold
    }

    pub fn entry(&self) -> LogLevel {
        self.entry_level
    }

    pub fn exit(&self) -> LogLevel {
        self.exit_level
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_defaults_to_uppercased_ident() {
        assert_eq!(OperationOptions::new("card_payment").name(), "CARD_PAYMENT");
        assert_eq!(OperationOptions::new("x").label("  ").name(), "X");
    }

    #[test]
    fn test_defaults() {
        let opts = OperationOptions::new("op");
        assert!(opts.logs_params());
        assert!(opts.logs_result());
        assert!(!opts.audited());
        assert!(!opts.is_skipped());
        assert_eq!(opts.threshold_override(), None);
        assert_eq!(opts.entry(), LogLevel::Info);
        assert_eq!(opts.exit(), LogLevel::Info);
    }

    #[test]
    fn test_level_names() {
        let level: LogLevel = serde_json::from_str(r#""WARN""#).unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(LogLevel::Debug.as_tracing(), Level::DEBUG);
    }
}
