//! Propagation for blocking `reqwest` calls.

use axum::http::HeaderMap;

use crate::context;
use crate::propagation::inject;

/// Attach the caller's context headers to a blocking request.
///
/// Reads the live store, so call it on the thread that owns the unit of work.
pub trait BlockingPropagation {
    fn with_context(self) -> Self;
}

impl BlockingPropagation for reqwest::blocking::RequestBuilder {
    fn with_context(self) -> Self {
        let mut headers = HeaderMap::new();
        if inject(&context::current(), &mut headers) == 0 {
            return self;
        }
        self.headers(headers)
    }
}
