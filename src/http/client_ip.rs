//! Proxy-aware client address resolution.

use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::http::headers::CLIENT_IP_HEADERS;

/// Resolve the originating client address.
///
/// Forwarding headers win over the peer address. A chain such as
/// `client, proxy1, proxy2` yields its left-most entry. Blank values and the
/// literal `unknown` are skipped.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok())
        .filter_map(first_hop)
        .next()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn first_hop(value: &str) -> Option<String> {
    let first = value.split(',').next()?.trim();
    if first.is_empty() || first.eq_ignore_ascii_case("unknown") {
        None
    } else {
        Some(first.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:54321".parse().unwrap())
    }

    #[test]
    fn test_falls_back_to_peer() {
        assert_eq!(resolve_client_ip(&HeaderMap::new(), peer()).as_deref(), Some("192.0.2.10"));
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_forwarded_chain_takes_leftmost() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.2, 10.0.0.3"));
        assert_eq!(resolve_client_ip(&headers, peer()).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_priority_order() {
        let mut headers = HeaderMap::new();
        headers.insert("wl-proxy-client-ip", HeaderValue::from_static("198.51.100.4"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.3"));
        assert_eq!(resolve_client_ip(&headers, peer()).as_deref(), Some("198.51.100.3"));
    }

    #[test]
    fn test_unknown_and_blank_are_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));
        headers.insert("x-real-ip", HeaderValue::from_static("  "));
        headers.insert("http_client_ip", HeaderValue::from_static("198.51.100.9"));
        assert_eq!(resolve_client_ip(&headers, peer()).as_deref(), Some("198.51.100.9"));
    }
}
