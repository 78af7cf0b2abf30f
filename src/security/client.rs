//! Client identification for throttling.
//!
//! Resolution order: first `X-Forwarded-For` entry, then `X-Real-IP`, then
//! the transport peer address. Blank and `unknown` values fall through to the
//! next source, so resolution never fails.

use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Identifier used when neither headers nor a peer address are available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the identifier a request is counted under.
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, X_FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .and_then(usable);
    if let Some(client) = forwarded {
        return client.to_string();
    }

    if let Some(client) = header_str(headers, X_REAL_IP).and_then(usable) {
        return client.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Compose the counter key for a client and request path.
pub fn rate_key(client: &str, path: &str) -> String {
    format!("{}:{}", client, path)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn usable(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(UNKNOWN_CLIENT) {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:51234".parse().unwrap())
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let h = headers(&[
            (X_FORWARDED_FOR, "1.2.3.4, 10.0.0.1, 10.0.0.2"),
            (X_REAL_IP, "5.6.7.8"),
        ]);
        assert_eq!(client_identifier(&h, peer()), "1.2.3.4");
    }

    #[test]
    fn test_real_ip_used_without_forwarded_for() {
        let h = headers(&[(X_REAL_IP, "5.6.7.8")]);
        assert_eq!(client_identifier(&h, peer()), "5.6.7.8");
    }

    #[test]
    fn test_peer_address_is_last_resort() {
        assert_eq!(client_identifier(&HeaderMap::new(), peer()), "10.0.0.7");
        assert_eq!(client_identifier(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_malformed_forwarded_for_falls_through() {
        let h = headers(&[(X_FORWARDED_FOR, " , 1.2.3.4"), (X_REAL_IP, "5.6.7.8")]);
        assert_eq!(client_identifier(&h, peer()), "5.6.7.8");

        let h = headers(&[(X_FORWARDED_FOR, "unknown"), (X_REAL_IP, "UNKNOWN")]);
        assert_eq!(client_identifier(&h, peer()), "10.0.0.7");

        let h = headers(&[(X_FORWARDED_FOR, "")]);
        assert_eq!(client_identifier(&h, peer()), "10.0.0.7");
    }

    #[test]
    fn test_non_ascii_header_is_ignored() {
        let mut h = HeaderMap::new();
        h.insert(X_FORWARDED_FOR, HeaderValue::from_bytes(b"\xfa\xfb").unwrap());
        assert_eq!(client_identifier(&h, peer()), "10.0.0.7");
    }

    #[test]
    fn test_rate_key_joins_client_and_path() {
        assert_eq!(rate_key("1.2.3.4", "/api/auth/signin"), "1.2.3.4:/api/auth/signin");
    }
}
