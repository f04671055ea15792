//! Admin-token gating for `/reload` and `/control/*` (spec §4.7's "Admin-token
//! check: constant-time comparison against a configured allow-list").

use crate::state::SharedState;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName};
use gateway_core::GatewayError;

/// Byte-for-byte equal, but always walks the full length of both strings so
/// the comparison time doesn't leak how many leading bytes matched.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Rejects the request unless `headers` carries a token from
/// `security.adminAuth.tokens` under the configured header name.
pub fn require_admin(state: &SharedState, headers: &HeaderMap) -> Result<(), GatewayError> {
    let admin = &state.config.security.admin_auth;
    if !admin.enabled {
        return Ok(());
    }
    let header_name = HeaderName::from_bytes(admin.header_name.as_bytes())
        .map_err(|_| GatewayError::Unauthorized)?;
    let presented = headers
        .get(&header_name)
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::Unauthorized)?;

    let matches = admin.tokens.iter().any(|token| constant_time_eq(token, presented));
    if matches {
        Ok(())
    } else {
        Err(GatewayError::Unauthorized)
    }
}

/// An axum extractor-shaped helper for handlers that only need the auth
/// check and nothing else from the request.
pub async fn admin_guard(State(state): State<SharedState>, headers: HeaderMap) -> Result<(), GatewayError> {
    require_admin(&state, &headers)
}
