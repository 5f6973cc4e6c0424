//! Inbound request boundary.
//!
//! # Responsibilities
//! - Resolve the correlation id (primary header, fallback header, generated)
//! - Copy transaction id, client address, uri and method into the context
//! - Ask the optional identity resolver for the user id
//! - Run the inner service inside a fresh context scope
//! - Echo the correlation id on the response
//!
//! The context is destroyed when the scope ends, whether the inner future
//! completes, fails, panics or is dropped.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ConnectInfo;
use axum::http::header::InvalidHeaderName;
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Request, Response};
use tower::{Layer, Service};

use crate::config::CorrelationConfig;
use crate::context::{self, ContextKey, RequestContext};
use crate::http::client_ip::resolve_client_ip;
use crate::http::headers::{X_CORRELATION_ID, X_REQUEST_ID, X_TRANSACTION_ID};

/// Pluggable source of the authenticated user id.
///
/// Declared once when the layer is built; a missing resolver simply leaves
/// `user_id` unset.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap, extensions: &Extensions) -> Option<String>;
}

impl<F> IdentityResolver for F
where
    F: Fn(&HeaderMap, &Extensions) -> Option<String> + Send + Sync,
{
    fn resolve(&self, headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
        self(headers, extensions)
    }
}

/// Resolved `[correlation]` settings with parsed header names.
#[derive(Debug, Clone)]
pub struct BoundarySettings {
    pub enabled: bool,
    pub header_name: HeaderName,
    pub fallback_header_name: HeaderName,
    pub generate_if_missing: bool,
    pub include_client_ip: bool,
    pub include_request_uri: bool,
}

impl Default for BoundarySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: X_CORRELATION_ID,
            fallback_header_name: X_REQUEST_ID,
            generate_if_missing: true,
            include_client_ip: true,
            include_request_uri: true,
        }
    }
}

impl BoundarySettings {
    pub fn from_config(config: &CorrelationConfig) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            enabled: config.enabled,
            header_name: HeaderName::from_bytes(config.header_name.as_bytes())?,
            fallback_header_name: HeaderName::from_bytes(config.fallback_header_name.as_bytes())?,
            generate_if_missing: config.generate_if_missing,
            include_client_ip: config.include_client_ip,
            include_request_uri: config.include_request_uri,
        })
    }

    /// Build the context for one inbound request.
    pub fn resolve<B>(
        &self,
        request: &Request<B>,
        identity: Option<&dyn IdentityResolver>,
    ) -> RequestContext {
        let mut ctx = RequestContext::new();
        if !self.enabled {
            return ctx;
        }
        let headers = request.headers();

        let correlation_id = header_value(headers, &self.header_name)
            .or_else(|| header_value(headers, &self.fallback_header_name))
            .or_else(|| {
                self.generate_if_missing
                    .then(|| uuid::Uuid::new_v4().to_string())
            });
        if let Some(id) = correlation_id {
            ctx.set(ContextKey::CorrelationId, id);
        }

        if let Some(tx) = header_value(headers, &X_TRANSACTION_ID) {
            ctx.set(ContextKey::TransactionId, tx);
        }

        if self.include_client_ip {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            if let Some(ip) = resolve_client_ip(headers, peer) {
                ctx.set(ContextKey::ClientIp, ip);
            }
        }

        if self.include_request_uri {
            ctx.set(ContextKey::RequestUri, request.uri().path());
            ctx.set(ContextKey::RequestMethod, request.method().as_str());
        }

        if let Some(user) = identity
            .and_then(|resolver| resolver.resolve(headers, request.extensions()))
            .filter(|user| !user.trim().is_empty())
        {
            ctx.set(ContextKey::UserId, user);
        }

        ctx
    }
}

fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Tower layer installing the request boundary.
#[derive(Clone, Default)]
pub struct CorrelationLayer {
    settings: Arc<BoundarySettings>,
    identity: Option<Arc<dyn IdentityResolver>>,
}

impl CorrelationLayer {
    pub fn new(settings: BoundarySettings) -> Self {
        Self {
            settings: Arc::new(settings),
            identity: None,
        }
    }

    pub fn with_identity(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.identity = Some(Arc::new(resolver));
        self
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationService {
            inner,
            settings: self.settings.clone(),
            identity: self.identity.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CorrelationService<S> {
    inner: S,
    settings: Arc<BoundarySettings>,
    identity: Option<Arc<dyn IdentityResolver>>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorrelationService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // The readied service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let ctx = self.settings.resolve(&request, self.identity.as_deref());
        let header_name = self.settings.header_name.clone();
        // Echo the id resolved here, whatever the handler does to the context.
        let echoed = ctx
            .get(ContextKey::CorrelationId)
            .and_then(|id| HeaderValue::from_str(id).ok());

        Box::pin(context::scope(ctx, async move {
            let mut response = inner.call(request).await?;
            if let Some(value) = echoed {
                response.headers_mut().insert(header_name, value);
            }
            Ok(response)
        }))
    }
}
