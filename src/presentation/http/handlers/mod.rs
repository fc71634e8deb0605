pub mod abuse;
pub mod capacity;
pub mod health;
pub mod mint;

use axum::http::HeaderMap;

/// Best-effort client IP extraction: `X-Forwarded-For` (first hop), then
/// `X-Real-IP`, then a loopback fallback for direct/local connections.
pub(super) fn extract_client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or("127.0.0.1")
        .to_string()
}
