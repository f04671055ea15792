use std::fmt;

/// Errors surfaced by the rate limiter map itself (not by individual buckets,
/// which report availability via `bool`/duration rather than `Result`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimiterError {
    /// `key` was never registered with [`crate::RateLimiter::register`].
    UnknownKey(usize),
}

impl fmt::Display for RateLimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimiterError::UnknownKey(key) => write!(f, "no bucket registered for key {key}"),
        }
    }
}

impl std::error::Error for RateLimiterError {}
