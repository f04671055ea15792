//! Per-attempt header rewriting.

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

/// Hop-by-hop headers that must never be forwarded upstream (RFC 7230 §6.1),
/// plus `host`, which the client's target and the upstream's target disagree
/// on by construction.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Strips hop-by-hop headers and replaces the client's auth header with the
/// upstream credential's, in place.
pub fn rewrite_for_upstream(headers: &mut HeaderMap, upstream_secret: &str) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers.remove(AUTHORIZATION);
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {upstream_secret}")) {
        headers.insert(AUTHORIZATION, value);
    }
}

/// Whether a response header is hop-by-hop and so must not be relayed
/// verbatim to the client, the same list [`rewrite_for_upstream`] strips
/// going the other way.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.contains(&name)
}

/// Returns the existing `x-request-id`, or mints one if absent.
pub fn ensure_request_id(headers: &mut HeaderMap) -> String {
    if let Some(existing) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return existing.to_string();
    }
    let id = generate_request_id();
    if let Ok(value) = HeaderValue::from_str(&id) {
        headers.insert(
            HeaderName::from_static(REQUEST_ID_HEADER),
            value,
        );
    }
    id
}

fn generate_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("req_{nanos:x}_{n:x}")
}
