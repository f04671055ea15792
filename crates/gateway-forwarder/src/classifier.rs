//! Outcome classification for a single upstream attempt.
//!
//! Grounded on `tower_resilience_circuitbreaker::classifier::FailureClassifier`'s
//! shape (a pure function from an outcome to retriable/not), extended here to
//! cover transport-level failures — a timed-out or hung-up connection never
//! produces an HTTP status code, so `gateway_core::classify_upstream_status`
//! alone cannot describe it.

use gateway_core::GatewayError;

/// What actually happened on the wire for one attempt, before it has been
/// mapped into the taxonomy.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// A response was received with this status code.
    Status(u16),
    /// `reqwest` reported a timeout (connect, read, or the overall request).
    Timeout,
    /// The connection was reset or closed before a full response arrived.
    Hangup,
    /// Any other transport-level failure (DNS, TLS, connect refused, ...).
    Network(String),
}

/// Classifies an attempt outcome into the gateway's error taxonomy, or `None`
/// for success. Mirrors spec §4.4 step 4.
pub fn classify(outcome: &AttemptOutcome) -> Option<GatewayError> {
    match outcome {
        AttemptOutcome::Status(status) => gateway_core::classify_upstream_status(*status),
        AttemptOutcome::Timeout => Some(GatewayError::UpstreamTimeout),
        AttemptOutcome::Hangup => Some(GatewayError::UpstreamHangup),
        AttemptOutcome::Network(message) => Some(GatewayError::UpstreamNetwork {
            message: message.clone(),
        }),
    }
}

/// Translates a `reqwest::Error` into an [`AttemptOutcome`], used when the
/// request fails before any response is received.
pub fn outcome_from_reqwest_error(err: &reqwest::Error) -> AttemptOutcome {
    if err.is_timeout() {
        AttemptOutcome::Timeout
    } else if err.is_connect() || err.is_request() {
        AttemptOutcome::Hangup
    } else {
        AttemptOutcome::Network(err.to_string())
    }
}
