//! Client address resolution behind proxies.

use std::net::{IpAddr, Ipv4Addr};

use http::HeaderMap;

/// Proxy headers consulted in order before the socket peer.
pub const FORWARDING_HEADERS: [&str; 5] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

/// Fallback when nothing usable is known.
pub const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// First valid IP from the forwarding headers, else `peer`, else `0.0.0.0`.
///
/// Only the first comma-separated element of each header counts.
pub fn resolve(headers: &HeaderMap, peer: Option<IpAddr>) -> IpAddr {
    FORWARDING_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            value
                .split(',')
                .next()
                .and_then(|first| first.trim().parse::<IpAddr>().ok())
        })
        .or(peer)
        .unwrap_or(UNKNOWN_CLIENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn peer() -> Option<IpAddr> {
        Some("192.0.2.10".parse().unwrap())
    }

    #[test]
    fn test_peer_without_headers() {
        assert_eq!(resolve(&HeaderMap::new(), peer()), peer().unwrap());
        assert_eq!(resolve(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_first_forwarded_element() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        assert_eq!(resolve(&headers, peer()), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_header_priority_and_invalid_values() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("not-an-ip"));
        headers.insert("x-forwarded", HeaderValue::from_static("2001:db8::1"));
        headers.insert("forwarded", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(resolve(&headers, peer()), "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_rfc7239_syntax_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("forwarded", HeaderValue::from_static("for=198.51.100.2;proto=https"));
        assert_eq!(resolve(&headers, peer()), peer().unwrap());
    }
}
