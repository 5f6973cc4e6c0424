//! HTTP inbound boundary and demo server.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout, tracing)
//!     → boundary.rs (resolve correlation id, client ip, user id; open scope)
//!     → handler (interceptor operations, step loggers)
//!     → boundary.rs (echo correlation id header, scope ends)
//!     → Send to client
//! ```

pub mod boundary;
pub mod client_ip;
pub mod headers;
pub mod server;

pub use boundary::{BoundarySettings, CorrelationLayer, CorrelationService, IdentityResolver};
pub use client_ip::resolve_client_ip;
pub use server::HttpServer;
