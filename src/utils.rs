use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;

/// Creates a truncated, salted hash of an identifier for safe logging.
///
/// Submitter emails and similar identifiers are never logged raw; this gives
/// operators a stable correlation handle without putting PII in the logs.
pub fn log_safe_id(id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(id.as_bytes());
    let hash = hasher.finalize();

    // Take first 4 bytes and format each as hex
    hash[..4]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}

/// Extracts the best-effort client IP from request headers.
///
/// Checks X-Forwarded-For (first hop) then X-Real-IP, falling back to the
/// socket peer address. In production the reverse proxy must set
/// X-Forwarded-For and strip untrusted values from inbound requests.
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn log_safe_id_is_stable_and_short() {
        let a = log_safe_id("taro@example.com", "salt");
        let b = log_safe_id("taro@example.com", "salt");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn log_safe_id_depends_on_salt() {
        assert_ne!(
            log_safe_id("taro@example.com", "salt-a"),
            log_safe_id("taro@example.com", "salt-b")
        );
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(
            extract_client_ip(&headers, None),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(
            extract_client_ip(&headers, None),
            Some("198.51.100.4".to_string())
        );

        let headers = HeaderMap::new();
        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(
            extract_client_ip(&headers, Some(peer)),
            Some("127.0.0.1".to_string())
        );
        assert_eq!(extract_client_ip(&headers, None), None);
    }
}
