//! In-memory log capture backing `GET /logs` and `POST /control/clear-logs`.
//!
//! Nothing in the pack keeps a queryable log tail for an HTTP endpoint like
//! this; `gateway_core::RingBuffer` is generic enough to hold formatted lines
//! directly (only its percentile methods are specialised to `f64`), so this
//! is a `tracing_subscriber::Layer` that renders each event and pushes the
//! line into one, the same "ring buffer behind a mutex" shape already used
//! for history and the event bus's replay window.

use gateway_core::RingBuffer;
use parking_lot::Mutex;
use std::fmt::Write as _;
use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

pub struct LogRing {
    lines: Mutex<RingBuffer<String>>,
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(RingBuffer::new(capacity.max(1))),
        }
    }

    pub fn push(&self, line: String) {
        self.lines.lock().push(line);
    }

    pub fn recent(&self, k: usize) -> Vec<String> {
        let lines = self.lines.lock();
        lines.iter().rev().take(k).rev().cloned().collect()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.message, " {}={value:?}", field.name());
        }
    }
}

/// A `tracing_subscriber::Layer` that renders `level target: message` lines
/// into a shared [`LogRing`], independent of whatever other layers (e.g. the
/// teacher's `fmt` layer to stdout) are also installed.
pub struct LogRingLayer {
    ring: std::sync::Arc<LogRing>,
}

impl LogRingLayer {
    pub fn new(ring: std::sync::Arc<LogRing>) -> Self {
        Self { ring }
    }
}

impl<S: Subscriber> Layer<S> for LogRingLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let line = format!(
            "{} {} {}: {}",
            chrono::Utc::now().to_rfc3339(),
            event.metadata().level(),
            event.metadata().target(),
            visitor.message.trim_start(),
        );
        self.ring.push(line);
    }
}
