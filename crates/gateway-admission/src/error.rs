//! Error types for the admission gate.

/// Errors the admission gate rejects a request with.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdmissionError {
    /// Declared body size exceeds `maxBodySize`.
    #[error("request body of {size} bytes exceeds the {limit} byte limit")]
    RequestTooLarge { size: usize, limit: usize },
    /// Concurrency ceiling reached and the wait queue is also full.
    #[error("admission queue is full, retry after {retry_after_ms}ms")]
    Backpressure { retry_after_ms: u64 },
    /// Queued past `queueTimeout` without acquiring a permit.
    #[error("request timed out waiting in the admission queue")]
    QueueTimeout,
}

pub type Result<T> = std::result::Result<T, AdmissionError>;

impl From<AdmissionError> for gateway_core::GatewayError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::RequestTooLarge { size, limit } => {
                gateway_core::GatewayError::RequestTooLarge { size, limit }
            }
            AdmissionError::Backpressure { retry_after_ms } => {
                gateway_core::GatewayError::Backpressure { retry_after_ms }
            }
            AdmissionError::QueueTimeout => gateway_core::GatewayError::QueueTimeout,
        }
    }
}
