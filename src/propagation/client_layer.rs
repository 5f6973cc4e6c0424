//! Propagation layer for tower-based HTTP clients.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::Request;
use tower::{Layer, Service};

use crate::context::ContextSnapshot;
use crate::propagation::inject;

/// Tower layer stamping outbound requests with the caller's context.
///
/// The snapshot is taken in `Service::call`, i.e. when the request is
/// scheduled, and the inner future runs inside it.
#[derive(Debug, Clone)]
pub struct PropagationLayer {
    enabled: bool,
}

impl Default for PropagationLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PropagationLayer {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Layer that still scopes the inner future but writes no headers.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl<S> Layer<S> for PropagationLayer {
    type Service = PropagationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PropagationService {
            inner,
            enabled: self.enabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropagationService<S> {
    inner: S,
    enabled: bool,
}

impl<S, B> Service<Request<B>> for PropagationService<S>
where
    S: Service<Request<B>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let snapshot = ContextSnapshot::capture();
        if self.enabled {
            inject(snapshot.context(), request.headers_mut());
        }
        let fut = self.inner.call(request);
        Box::pin(snapshot.scope(fut))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{self, ContextKey, RequestContext};
    use axum::http::HeaderMap;
    use std::convert::Infallible;
    use tower::ServiceExt;

    async fn echo_headers(request: Request<()>) -> Result<HeaderMap, Infallible> {
        Ok(request.headers().clone())
    }

    #[tokio::test]
    async fn test_headers_injected_at_call_time() {
        let svc = PropagationLayer::new().layer(tower::service_fn(echo_headers));
        let ctx = RequestContext::new()
            .with(ContextKey::CorrelationId, "abc-123")
            .with(ContextKey::UserId, "u-9");

        let headers = context::scope(ctx, svc.oneshot(Request::new(()))).await.unwrap();
        assert_eq!(headers["x-correlation-id"], "abc-123");
        assert_eq!(headers["x-user-id"], "u-9");
    }

    #[tokio::test]
    async fn test_inner_future_runs_in_snapshot_scope() {
        let mut svc = PropagationLayer::disabled().layer(tower::service_fn(|_: Request<()>| async {
            Ok::<_, Infallible>(context::get(ContextKey::CorrelationId))
        }));
        let ctx = RequestContext::new().with(ContextKey::CorrelationId, "abc-123");

        let call = context::scope(ctx, async {
            svc.ready().await.unwrap().call(Request::new(()))
        })
        .await;
        // Awaited after the originating scope has ended.
        assert_eq!(call.await.unwrap().as_deref(), Some("abc-123"));
    }

    #[tokio::test]
    async fn test_disabled_writes_no_headers() {
        let svc = PropagationLayer::disabled().layer(tower::service_fn(echo_headers));
        let ctx = RequestContext::new().with(ContextKey::CorrelationId, "abc-123");
        let headers = context::scope(ctx, svc.oneshot(Request::new(()))).await.unwrap();
        assert!(headers.is_empty());
    }
}
