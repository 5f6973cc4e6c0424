//! Propagation for async `reqwest` calls.
//!
//! The request may run after the originating unit of work has moved on, so
//! headers come from a snapshot taken where the call is scheduled:
//!
//! ```no_run
//! use paylog::context::ContextSnapshot;
//! use paylog::propagation::AsyncPropagation;
//!
//! # async fn notify(client: reqwest::Client) -> reqwest::Result<()> {
//! let snapshot = ContextSnapshot::capture();
//! let request = client.post("http://ledger/entries").with_snapshot(&snapshot);
//! tokio::spawn(async move { request.send().await });
//! # Ok(())
//! # }
//! ```

use axum::http::HeaderMap;

use crate::context::ContextSnapshot;
use crate::propagation::inject;

pub trait AsyncPropagation {
    fn with_snapshot(self, snapshot: &ContextSnapshot) -> Self;
}

impl AsyncPropagation for reqwest::RequestBuilder {
    fn with_snapshot(self, snapshot: &ContextSnapshot) -> Self {
        let mut headers = HeaderMap::new();
        if inject(snapshot.context(), &mut headers) == 0 {
            return self;
        }
        self.headers(headers)
    }
}
