// Device fingerprinting for refresh token tracking

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;

/// Derive a stable device identifier from client characteristics.
/// Returns None when no user agent is available (the fingerprint would
/// collapse to the IP alone).
pub fn generate_device_fingerprint(
    user_agent: &Option<String>,
    addr: &SocketAddr,
    headers: &HeaderMap,
) -> Option<String> {
    let ua = user_agent.as_ref()?;

    let mut hasher = Sha256::new();
    hasher.update(ua.as_bytes());
    hasher.update(addr.ip().to_string().as_bytes());

    for header in ["accept-language", "accept-encoding"] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            hasher.update(value.as_bytes());
        }
    }

    Some(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(last_octet: u8) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, last_octet)), 8080)
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let mut headers = HeaderMap::new();
        headers.insert("accept-language", HeaderValue::from_static("de-DE"));

        let ua = Some("Mozilla/5.0".to_string());
        let a = generate_device_fingerprint(&ua, &addr(1), &headers);
        let b = generate_device_fingerprint(&ua, &addr(1), &headers);
        assert_eq!(a, b);
        assert_eq!(a.unwrap().len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_by_ip() {
        let headers = HeaderMap::new();
        let ua = Some("Mozilla/5.0".to_string());
        assert_ne!(
            generate_device_fingerprint(&ua, &addr(1), &headers),
            generate_device_fingerprint(&ua, &addr(2), &headers)
        );
    }

    #[test]
    fn test_fingerprint_requires_user_agent() {
        let headers = HeaderMap::new();
        assert!(generate_device_fingerprint(&None, &addr(1), &headers).is_none());
    }
}
