//! In-process publish/subscribe for request-completion events. Drives SSE
//! fan-out and the request trace store; the forwarder's completion callback
//! is the sole publisher, everything downstream only ever subscribes.

pub mod bus;
pub mod record;
pub mod sse;

pub use bus::{EventBus, Subscriber, SubscriberEvent};
pub use record::{EventRecord, EventRecordInput, EventStatus};
pub use sse::{sse_stream, SseConfig};
