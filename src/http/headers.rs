//! Header names shared by the inbound and outbound sides.

use axum::http::HeaderName;

pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_TRANSACTION_ID: HeaderName = HeaderName::from_static("x-transaction-id");
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Proxy-forwarding headers scanned for the client address, in priority order.
pub const CLIENT_IP_HEADERS: [&str; 6] = [
    "x-forwarded-for",
    "x-real-ip",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_x_forwarded_for",
    "http_client_ip",
];
