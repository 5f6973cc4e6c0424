//! Operation wrapping.
//!
//! # Responsibilities
//! - Tag the context with `operation` / `operation_id` for the call only
//! - Emit masked entry, exit and error records
//! - Flag threshold overruns and record latency metrics
//! - Emit audit records when the operation asks for them
//! - Return the wrapped call's result untouched
//!
//! A call guard owns the per-call state. Dropping it before the call
//! finished (the future was cancelled, or the closure unwound) still fires
//! the error path and restores the context.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde::Serialize;
use serde_json::Value;

use crate::config::InstrumentationConfig;
use crate::context::{self, ContextKey};
use crate::interceptor::audit::{AuditRecord, AuditStatus};
use crate::interceptor::options::{LogLevel, OperationOptions};
use crate::interceptor::params::{Params, UNSERIALIZABLE};
use crate::interceptor::TARGET;
use crate::masking::MaskingEngine;
use crate::observability::metrics;

/// `tracing` needs the level at compile time; dispatch on the runtime one.
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!(target: TARGET, $($arg)+),
            LogLevel::Debug => tracing::debug!(target: TARGET, $($arg)+),
            LogLevel::Info => tracing::info!(target: TARGET, $($arg)+),
            LogLevel::Warn => tracing::warn!(target: TARGET, $($arg)+),
        }
    };
}

const MASKING_FAILED: &str = "<masking failed>";

/// Process-wide instrumentation switches, swappable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentationSettings {
    pub enabled: bool,
    pub default_threshold: Duration,
}

impl Default for InstrumentationSettings {
    fn default() -> Self {
        Self::from_config(&InstrumentationConfig::default())
    }
}

impl InstrumentationSettings {
    pub fn from_config(config: &InstrumentationConfig) -> Self {
        Self {
            enabled: config.enabled,
            default_threshold: Duration::from_millis(config.performance_threshold_ms),
        }
    }
}

/// Factory for instrumented operations.
///
/// Cheap to clone; clones share the masking engine and the live settings, so
/// a [`reload`](Self::reload) reaches every operation built from any clone.
#[derive(Debug, Clone)]
pub struct Interceptor {
    masker: Arc<MaskingEngine>,
    settings: Arc<ArcSwap<InstrumentationSettings>>,
}

impl Interceptor {
    pub fn new(masker: Arc<MaskingEngine>, settings: InstrumentationSettings) -> Self {
        Self {
            masker,
            settings: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    pub fn from_config(masker: Arc<MaskingEngine>, config: &InstrumentationConfig) -> Self {
        Self::new(masker, InstrumentationSettings::from_config(config))
    }

    /// Swap in new settings; operations pick them up on their next call.
    pub fn reload(&self, config: &InstrumentationConfig) {
        let settings = InstrumentationSettings::from_config(config);
        self.settings.store(Arc::new(settings));
        tracing::info!(
            enabled = settings.enabled,
            threshold_ms = config.performance_threshold_ms,
            "Instrumentation settings reloaded"
        );
    }

    pub fn settings(&self) -> InstrumentationSettings {
        **self.settings.load()
    }

    pub fn masker(&self) -> &Arc<MaskingEngine> {
        &self.masker
    }

    /// Wrap an operation whose result is logged through its serde projection.
    pub fn wrap<R: Serialize + 'static>(&self, options: OperationOptions) -> Operation<R> {
        self.wrap_projected(options, |result: &R| {
            serde_json::to_value(result).unwrap_or_else(|_| Value::String(UNSERIALIZABLE.to_string()))
        })
    }

    /// Wrap an operation whose result is logged through `project`.
    pub fn wrap_projected<R, P>(&self, options: OperationOptions, project: P) -> Operation<R>
    where
        P: Fn(&R) -> Value + Send + Sync + 'static,
    {
        Operation {
            options: Arc::new(options),
            masker: self.masker.clone(),
            settings: self.settings.clone(),
            project: Arc::new(project),
        }
    }
}

type Projection<R> = dyn Fn(&R) -> Value + Send + Sync;

/// An instrumented operation, built once and called many times.
pub struct Operation<R> {
    options: Arc<OperationOptions>,
    masker: Arc<MaskingEngine>,
    settings: Arc<ArcSwap<InstrumentationSettings>>,
    project: Arc<Projection<R>>,
}

impl<R> Clone for Operation<R> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            masker: self.masker.clone(),
            settings: self.settings.clone(),
            project: self.project.clone(),
        }
    }
}

impl<R> std::fmt::Debug for Operation<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<R> Operation<R> {
    pub fn options(&self) -> &OperationOptions {
        &self.options
    }

    /// Effective threshold, or `None` when the call should pass straight through.
    fn instrumented(&self) -> Option<Duration> {
        let settings = self.settings.load();
        if self.options.is_skipped() || !settings.enabled {
            return None;
        }
        Some(self.options.threshold_override().unwrap_or(settings.default_threshold))
    }

    /// Run a blocking call.
    pub fn call<E, F>(&self, params: Params, f: F) -> Result<R, E>
    where
        F: FnOnce() -> Result<R, E>,
        E: std::error::Error + 'static,
    {
        let Some(threshold) = self.instrumented() else {
            return f();
        };
        let mut guard = CallGuard::enter(self, &params, threshold);
        let result = f();
        guard.finish(&result);
        result
    }

    /// Run an async call. Dropping the returned future before it completes
    /// is reported as a `Cancelled` failure.
    pub async fn call_async<E, Fut>(&self, params: Params, fut: Fut) -> Result<R, E>
    where
        Fut: Future<Output = Result<R, E>>,
        E: std::error::Error + 'static,
    {
        let Some(threshold) = self.instrumented() else {
            return fut.await;
        };
        let mut guard = CallGuard::enter(self, &params, threshold);
        let result = fut.await;
        guard.finish(&result);
        result
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn guarded<T>(f: impl FnOnce() -> T) -> Option<T> {
    catch_unwind(AssertUnwindSafe(f)).ok()
}

/// Per-call state; restores the caller's operation tags on drop.
struct CallGuard<'a, R> {
    op: &'a Operation<R>,
    operation_id: String,
    previous_operation: Option<String>,
    previous_operation_id: Option<String>,
    started: Instant,
    threshold: Duration,
    finished: bool,
}

impl<'a, R> CallGuard<'a, R> {
    fn enter(op: &'a Operation<R>, params: &Params, threshold: Duration) -> Self {
        let name = op.options.name();
        let operation_id = format!("{:08x}", rand::random::<u32>());

        let previous_operation = context::get(ContextKey::Operation);
        let previous_operation_id = context::get(ContextKey::OperationId);
        context::set(ContextKey::Operation, name);
        context::set(ContextKey::OperationId, operation_id.as_str());

        let guard = Self {
            op,
            operation_id,
            previous_operation,
            previous_operation_id,
            started: Instant::now(),
            threshold,
            finished: false,
        };
        guard.log_entry(params);
        guard
    }

    fn log_entry(&self, params: &Params) {
        let options = &self.op.options;
        let level = options.entry();
        if !level.enabled() {
            return;
        }
        let name = options.name();
        let id = self.operation_id.as_str();

        if !options.logs_params() || params.is_empty() {
            event_at!(level, operation = %name, operation_id = %id, "ENTRY [{}]", name);
            return;
        }
        match guarded(|| params.render_masked(&self.op.masker)) {
            Some(rendered) => event_at!(
                level,
                operation = %name,
                operation_id = %id,
                params = %rendered,
                "ENTRY [{}] params={}",
                name,
                rendered
            ),
            None => event_at!(
                level,
                operation = %name,
                operation_id = %id,
                degraded = true,
                "ENTRY [{}]",
                name
            ),
        }
    }

    fn finish<E: std::error::Error + 'static>(&mut self, result: &Result<R, E>) {
        self.finished = true;
        let elapsed = self.started.elapsed();
        match result {
            Ok(value) => self.on_success(value, elapsed),
            Err(error) => self.on_failure(
                std::any::type_name::<E>(),
                &error.to_string(),
                Some(error as &(dyn std::error::Error + 'static)),
                elapsed,
            ),
        }
    }

    fn on_success(&self, value: &R, elapsed: Duration) {
        let options = &self.op.options;
        let name = options.name();
        let id = self.operation_id.as_str();
        let ms = millis(elapsed);

        let level = options.exit();
        if level.enabled() {
            let rendered = if options.logs_result() {
                guarded(|| {
                    let projected = (self.op.project)(value);
                    (!projected.is_null()).then(|| self.op.masker.mask_json(&projected).to_string())
                })
            } else {
                Some(None)
            };
            match rendered {
                Some(Some(result)) => event_at!(
                    level,
                    operation = %name,
                    operation_id = %id,
                    duration_ms = ms,
                    result = %result,
                    "EXIT [{}] time={}ms result={}",
                    name,
                    ms,
                    result
                ),
                Some(None) => event_at!(
                    level,
                    operation = %name,
                    operation_id = %id,
                    duration_ms = ms,
                    "EXIT [{}] time={}ms",
                    name,
                    ms
                ),
                None => event_at!(
                    level,
                    operation = %name,
                    operation_id = %id,
                    duration_ms = ms,
                    degraded = true,
                    "EXIT [{}] time={}ms",
                    name,
                    ms
                ),
            }
        }

        if elapsed > self.threshold {
            let threshold_ms = millis(self.threshold);
            tracing::warn!(
                target: TARGET,
                operation = %name,
                operation_id = %id,
                duration_ms = ms,
                threshold_ms,
                "SLOW [{}] {}ms > threshold {}ms",
                name,
                ms,
                threshold_ms
            );
            metrics::record_slow(name, "success");
        }
        metrics::record_operation(name, "success", elapsed);

        if options.audited() {
            AuditRecord::new(name, id, AuditStatus::Success, elapsed).emit();
        }
    }

    fn on_failure(
        &self,
        error_type: &str,
        message: &str,
        error: Option<&(dyn std::error::Error + 'static)>,
        elapsed: Duration,
    ) {
        let options = &self.op.options;
        let name = options.name();
        let id = self.operation_id.as_str();
        let ms = millis(elapsed);
        let masker = &self.op.masker;

        let masked_type =
            guarded(|| masker.mask(error_type)).unwrap_or_else(|| MASKING_FAILED.to_string());
        let masked_message =
            guarded(|| masker.mask(message)).unwrap_or_else(|| MASKING_FAILED.to_string());

        match error {
            Some(error) => tracing::error!(
                target: TARGET,
                operation = %name,
                operation_id = %id,
                duration_ms = ms,
                error_type = %masked_type,
                error_message = %masked_message,
                error,
                "ERROR [{}] time={}ms error={}",
                name,
                ms,
                masked_message
            ),
            None => tracing::error!(
                target: TARGET,
                operation = %name,
                operation_id = %id,
                duration_ms = ms,
                error_type = %masked_type,
                error_message = %masked_message,
                "ERROR [{}] time={}ms error={}",
                name,
                ms,
                masked_message
            ),
        }
        metrics::record_operation(name, "failure", elapsed);

        if options.audited() {
            AuditRecord::new(name, id, AuditStatus::Failure, elapsed)
                .with_error(masked_type, masked_message)
                .emit();
        }
    }
}

impl<R> Drop for CallGuard<'_, R> {
    fn drop(&mut self) {
        if !self.finished {
            let elapsed = self.started.elapsed();
            if std::thread::panicking() {
                self.on_failure("Panicked", "operation panicked before completing", None, elapsed);
            } else {
                self.on_failure("Cancelled", "operation dropped before completing", None, elapsed);
            }
        }
        match self.previous_operation.take() {
            Some(previous) => context::set(ContextKey::Operation, previous),
            None => {
                context::clear(ContextKey::Operation);
            }
        }
        match self.previous_operation_id.take() {
            Some(previous) => context::set(ContextKey::OperationId, previous),
            None => {
                context::clear(ContextKey::OperationId);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;

    #[derive(Debug, thiserror::Error)]
    #[error("insufficient funds on {0}")]
    struct Declined(String);

    fn interceptor() -> Interceptor {
        Interceptor::new(
            Arc::new(MaskingEngine::with_defaults().unwrap()),
            InstrumentationSettings::default(),
        )
    }

    #[test]
    fn test_success_returns_value_and_clears_tags() {
        let op = interceptor().wrap::<u32>(OperationOptions::new("double"));
        let value = context::sync_scope(RequestContext::new(), || {
            let out = op.call(Params::new().with("n", &21), || Ok::<_, Declined>(42));
            assert_eq!(context::get(ContextKey::Operation), None);
            assert_eq!(context::get(ContextKey::OperationId), None);
            out
        });
        assert_eq!(value.unwrap(), 42);
    }

    #[test]
    fn test_tags_visible_inside_call() {
        let op = interceptor().wrap::<String>(OperationOptions::new("peek").label("PEEK"));
        let seen = context::sync_scope(RequestContext::new(), || {
            op.call(Params::new(), || {
                Ok::<_, Declined>(format!(
                    "{}:{}",
                    context::get(ContextKey::Operation).unwrap_or_default(),
                    context::get(ContextKey::OperationId).unwrap_or_default()
                ))
            })
        })
        .unwrap();
        let (name, id) = seen.split_once(':').unwrap();
        assert_eq!(name, "PEEK");
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_error_is_returned_unchanged() {
        let op = interceptor().wrap::<()>(OperationOptions::new("debit").audit(true));
        let err = context::sync_scope(RequestContext::new(), || {
            let out = op.call(Params::new(), || Err(Declined("FR7630006000011234567890189".into())));
            assert_eq!(context::get(ContextKey::OperationId), None);
            out
        })
        .unwrap_err();
        assert_eq!(err.0, "FR7630006000011234567890189");
    }

    #[test]
    fn test_nested_call_restores_outer_tags() {
        let outer = interceptor().wrap::<()>(OperationOptions::new("outer"));
        let inner = interceptor().wrap::<()>(OperationOptions::new("inner"));
        context::sync_scope(RequestContext::new(), || {
            outer
                .call(Params::new(), || {
                    let before = context::get(ContextKey::OperationId);
                    inner.call(Params::new(), || Ok::<_, Declined>(()))?;
                    assert_eq!(context::get(ContextKey::Operation).as_deref(), Some("OUTER"));
                    assert_eq!(context::get(ContextKey::OperationId), before);
                    Ok::<_, Declined>(())
                })
                .unwrap();
        });
    }

    #[test]
    fn test_skipped_operation_leaves_context_alone() {
        let op = interceptor().wrap::<()>(OperationOptions::new("health").skip());
        context::sync_scope(RequestContext::new(), || {
            op.call(Params::new(), || {
                assert_eq!(context::get(ContextKey::Operation), None);
                Ok::<_, Declined>(())
            })
            .unwrap();
        });
    }

    #[test]
    fn test_reload_disables_instrumentation() {
        let interceptor = interceptor();
        let op = interceptor.wrap::<()>(OperationOptions::new("toggle"));
        interceptor.reload(&InstrumentationConfig {
            enabled: false,
            ..InstrumentationConfig::default()
        });
        assert!(!interceptor.settings().enabled);
        context::sync_scope(RequestContext::new(), || {
            op.call(Params::new(), || {
                assert_eq!(context::get(ContextKey::Operation), None);
                Ok::<_, Declined>(())
            })
            .unwrap();
        });
    }

    #[test]
    fn test_panic_in_call_still_clears_tags() {
        let op = interceptor().wrap::<()>(OperationOptions::new("boom"));
        context::sync_scope(RequestContext::new(), || {
            let caught = std::panic::catch_unwind(AssertUnwindSafe(|| {
                op.call(Params::new(), || -> Result<(), Declined> { panic!("boom") })
            }));
            assert!(caught.is_err());
            assert_eq!(context::get(ContextKey::Operation), None);
        });
    }

    #[tokio::test]
    async fn test_async_call() {
        let op = interceptor().wrap::<u8>(OperationOptions::new("fetch"));
        let out = context::scope(RequestContext::new(), async {
            let out = op
                .call_async(Params::new(), async {
                    assert!(context::get(ContextKey::OperationId).is_some());
                    Ok::<_, Declined>(7)
                })
                .await;
            assert_eq!(context::get(ContextKey::OperationId), None);
            out
        })
        .await;
        assert_eq!(out.unwrap(), 7);
    }
}
