//! Shared primitives used across the gateway workspace.
//!
//! - [`error`] — the unified [`error::GatewayError`] taxonomy and its
//!   translation into HTTP responses.
//! - [`events`] — a generic, panic-safe event listener system reused by the
//!   credential pool and event bus for observability hooks.
//! - [`ring`] — a bounded ring buffer for latency samples and recent-request
//!   windows.

pub mod error;
pub mod events;
pub mod ring;

pub use error::GatewayError;
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use ring::RingBuffer;
