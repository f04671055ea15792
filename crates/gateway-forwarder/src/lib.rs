//! Streams admitted requests to the upstream, classifies the outcome, and
//! retries against a fresh credential when the outcome and the request body
//! both allow it.

pub mod classifier;
pub mod forwarder;
pub mod headers;
pub mod retry;
pub mod routing;
pub mod timeout;

pub use classifier::{classify, AttemptOutcome};
pub use forwarder::{ForwardFailure, ForwardOutcome, ForwardRequest, Forwarder, ForwarderConfig};
pub use retry::{AttemptRecord, RetryDecision, RetryPolicy};
pub use routing::{MappedModel, ModelRouter, PassthroughRouter};
pub use timeout::{AttemptClock, AttemptDeadlines, DeadlineExpired};
