//! Execution-unit-local context storage.
//!
//! The store is a tokio task-local. A unit of work enters it with [`scope`]
//! (async) or [`sync_scope`] (blocking); the context is dropped when the scope
//! ends, whether by return, error, unwinding or the future being dropped.
//!
//! Spawned tasks do not inherit the context. Take a [`ContextSnapshot`] at the
//! fork point and re-enter it in the new task with [`spawn_with`] or
//! [`ContextSnapshot::scope`].

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::context::keys::{ContextKey, RequestContext};

tokio::task_local! {
    static CURRENT: RefCell<RequestContext>;
}

/// Run `fut` as a unit of work owning `ctx`.
pub async fn scope<F: Future>(ctx: RequestContext, fut: F) -> F::Output {
    CURRENT.scope(RefCell::new(ctx), fut).await
}

/// Run `f` as a blocking unit of work owning `ctx`.
pub fn sync_scope<R>(ctx: RequestContext, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(RefCell::new(ctx), f)
}

/// Spawn `fut` on the runtime with `snapshot` restored inside the new task.
pub fn spawn_with<F>(snapshot: ContextSnapshot, fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(snapshot.scope(fut))
}

fn with_current<R>(f: impl FnOnce(&RefCell<RequestContext>) -> R) -> Option<R> {
    CURRENT.try_with(f).ok()
}

/// Whether the caller is inside a unit of work.
pub fn is_active() -> bool {
    with_current(|_| ()).is_some()
}

/// Set a field. No-op outside a scope.
pub fn set(key: ContextKey, value: impl Into<String>) {
    with_current(|cell| {
        if let Ok(mut ctx) = cell.try_borrow_mut() {
            ctx.set(key, value);
        }
    });
}

pub fn get(key: ContextKey) -> Option<String> {
    with_current(|cell| cell.try_borrow().ok()?.get(key).map(str::to_string)).flatten()
}

/// Remove a field, returning its previous value.
pub fn clear(key: ContextKey) -> Option<String> {
    with_current(|cell| cell.try_borrow_mut().ok()?.remove(key)).flatten()
}

pub fn clear_all() {
    with_current(|cell| {
        if let Ok(mut ctx) = cell.try_borrow_mut() {
            ctx.clear();
        }
    });
}

/// Copy of the current context; empty outside a scope.
pub fn current() -> RequestContext {
    with_current(|cell| cell.try_borrow().map(|ctx| ctx.clone()).unwrap_or_default())
        .unwrap_or_default()
}

pub fn snapshot() -> ContextSnapshot {
    ContextSnapshot::capture()
}

/// Replace the current context with the snapshot's fields.
pub fn restore(snapshot: &ContextSnapshot) {
    with_current(|cell| {
        if let Ok(mut ctx) = cell.try_borrow_mut() {
            *ctx = snapshot.context().clone();
        }
    });
}

/// Immutable copy of a context, cheap to clone and safe to send across tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSnapshot(Arc<RequestContext>);

impl ContextSnapshot {
    /// Capture the caller's current context.
    pub fn capture() -> Self {
        Self(Arc::new(current()))
    }

    pub fn context(&self) -> &RequestContext {
        &self.0
    }

    pub fn get(&self, key: ContextKey) -> Option<&str> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_context(self) -> RequestContext {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Run `fut` in a fresh unit of work seeded with this snapshot.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        scope(self.into_context(), fut).await
    }
}

impl From<RequestContext> for ContextSnapshot {
    fn from(ctx: RequestContext) -> Self {
        Self(Arc::new(ctx))
    }
}
