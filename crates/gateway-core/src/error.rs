//! The gateway's unified error taxonomy.
//!
//! Every component (admission gate, credential pool, forwarder, router) returns
//! its own leaf error type; [`GatewayError`] is the single place they all
//! convert into, in the same spirit as `tower_resilience_core::ResilienceError<E>`
//! eliminating per-layer `From` boilerplate. Unlike that generic wrapper, this
//! one is closed over a fixed taxonomy (spec §7) because the gateway's error
//! surface is part of its public HTTP contract, not an open extension point.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::time::Duration;

/// One entry per taxonomy code in spec §7. `code()` and `status()` are what the
/// HTTP layer needs; the `Display` impl is for logs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("request body of {size} bytes exceeds the {limit} byte limit")]
    RequestTooLarge { size: usize, limit: usize },

    #[error("admission queue is full, retry after {retry_after_ms}ms")]
    Backpressure { retry_after_ms: u64 },

    #[error("request timed out waiting in the admission queue")]
    QueueTimeout,

    #[error("unauthorized")]
    Unauthorized,

    #[error("method not allowed")]
    MethodNotAllowed { allowed: Vec<String> },

    #[error("not found")]
    NotFound,

    #[error("upstream returned 429")]
    Upstream429 { retry_after_ms: Option<u64> },

    #[error("upstream returned a 5xx status")]
    Upstream5xx { status: u16 },

    #[error("upstream returned a non-retriable 4xx status")]
    Upstream4xx { status: u16 },

    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("upstream connection closed prematurely")]
    UpstreamHangup,

    #[error("upstream network error: {message}")]
    UpstreamNetwork { message: String },

    #[error("no credential is currently available, retry after {retry_after_ms}ms")]
    PoolCold { retry_after_ms: u64 },

    #[error("retry budget exhausted after {attempts} attempts")]
    BudgetExhausted { attempts: u32 },

    #[error("in-flight request aborted by shutdown deadline")]
    ShutdownAborted,
}

impl GatewayError {
    /// The taxonomy code published in JSON error bodies and event records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestTooLarge { .. } => "REQUEST_TOO_LARGE",
            Self::Backpressure { .. } => "BACKPRESSURE",
            Self::QueueTimeout => "QUEUE_TIMEOUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::NotFound => "NOT_FOUND",
            Self::Upstream429 { .. } => "UPSTREAM_429",
            Self::Upstream5xx { .. } => "UPSTREAM_5XX",
            Self::Upstream4xx { .. } => "UPSTREAM_4XX",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::UpstreamHangup => "UPSTREAM_HANGUP",
            Self::UpstreamNetwork { .. } => "UPSTREAM_NETWORK",
            Self::PoolCold { .. } => "POOL_COLD",
            Self::BudgetExhausted { .. } => "BUDGET_EXHAUSTED",
            Self::ShutdownAborted => "SHUTDOWN_ABORTED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::RequestTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Backpressure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::QueueTimeout => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream429 { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream5xx { status } | Self::Upstream4xx { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamHangup | Self::UpstreamNetwork { .. } => StatusCode::BAD_GATEWAY,
            Self::PoolCold { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::BudgetExhausted { .. } => StatusCode::BAD_GATEWAY,
            Self::ShutdownAborted => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// `Retry-After` hint in milliseconds, when the taxonomy entry carries one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Backpressure { retry_after_ms } => Some(*retry_after_ms),
            Self::Upstream429 { retry_after_ms } => *retry_after_ms,
            Self::PoolCold { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Whether this outcome should be retried against another credential,
    /// per spec §4.4 step 4's classification.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Upstream429 { .. }
                | Self::Upstream5xx { .. }
                | Self::UpstreamTimeout
                | Self::UpstreamHangup
                | Self::UpstreamNetwork { .. }
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after_ms = self.retry_after_ms();
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
            retry_after_ms,
            request_id: None,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(ms) = retry_after_ms {
            if let Ok(value) = axum::http::HeaderValue::from_str(&ms.div_ceil(1000).to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        if let Self::MethodNotAllowed { allowed } = &self {
            if let Ok(value) = axum::http::HeaderValue::from_str(&allowed.join(", ")) {
                response.headers_mut().insert(axum::http::header::ALLOW, value);
            }
        }
        response
    }
}

/// Attaches a `request_id` to the JSON body of a [`GatewayError`] response.
///
/// The router/handlers know the request id; `GatewayError` itself does not
/// carry one so that leaf components can construct it without plumbing an id
/// through every error site.
pub fn with_request_id(err: GatewayError, request_id: impl Into<String>) -> Response {
    let status = err.status();
    let retry_after_ms = err.retry_after_ms();
    let body = ErrorBody {
        error: err.to_string(),
        code: err.code(),
        retry_after_ms,
        request_id: Some(request_id.into()),
    };
    let mut response = (status, Json(body)).into_response();
    if let Some(ms) = retry_after_ms {
        if let Ok(value) = axum::http::HeaderValue::from_str(&ms.div_ceil(1000).to_string()) {
            response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
        }
    }
    response
}

/// Classifies an upstream HTTP status code (and optional transport failure)
/// into the taxonomy, per spec §4.4 step 4.
pub fn classify_upstream_status(status: u16) -> Option<GatewayError> {
    match status {
        200..=299 => None,
        429 => Some(GatewayError::Upstream429 { retry_after_ms: None }),
        408 | 502 | 503 | 504 => Some(GatewayError::Upstream5xx { status }),
        400..=499 => Some(GatewayError::Upstream4xx { status }),
        500..=599 => Some(GatewayError::Upstream5xx { status }),
        _ => Some(GatewayError::Upstream4xx { status }),
    }
}

/// Convenience for computing a `Retry-After` duration as milliseconds.
pub fn millis(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_2xx_as_success() {
        assert!(classify_upstream_status(200).is_none());
        assert!(classify_upstream_status(201).is_none());
    }

    #[test]
    fn classifies_429_as_retriable() {
        let err = classify_upstream_status(429).unwrap();
        assert!(err.is_retriable());
        assert_eq!(err.code(), "UPSTREAM_429");
    }

    #[test]
    fn classifies_transient_5xx_family_as_retriable() {
        for status in [408, 502, 503, 504, 500] {
            let err = classify_upstream_status(status).unwrap();
            assert!(err.is_retriable(), "status {status} should be retriable");
        }
    }

    #[test]
    fn classifies_other_4xx_as_non_retriable() {
        let err = classify_upstream_status(400).unwrap();
        assert!(!err.is_retriable());
        assert_eq!(err.code(), "UPSTREAM_4XX");
    }
}
