use std::fmt;

/// Errors surfaced by the credential pool itself (not by individual upstream
/// calls, which are reported through `gateway_core::GatewayError`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No credential is configured at all.
    Empty,
    /// `index` does not name a configured credential.
    UnknownCredential(usize),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Empty => write!(f, "no credentials configured"),
            PoolError::UnknownCredential(index) => write!(f, "no credential at index {index}"),
        }
    }
}

impl std::error::Error for PoolError {}
