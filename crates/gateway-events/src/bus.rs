//! Single-publisher, many-subscriber event bus.
//!
//! One coordinator (this struct) issues `seq`; `tokio::sync::broadcast` fans
//! the record out to every subscriber's own bounded channel. A subscriber
//! that falls behind the bus's capacity gets `RecvError::Lagged`, exactly
//! the drop-oldest-and-mark behaviour `flowtrace-server`'s trace broadcaster
//! relies on for its WebSocket and SSE endpoints.

use crate::record::{EventRecord, EventRecordInput};
use chrono::Utc;
use gateway_core::RingBuffer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

pub struct EventBus {
    seq: AtomicU64,
    sender: broadcast::Sender<EventRecord>,
    recent: Mutex<RingBuffer<EventRecord>>,
}

impl EventBus {
    /// `capacity` bounds both the broadcast channel (how far a subscriber can
    /// lag before it starts dropping) and the replay window.
    pub fn new(capacity: usize, replay_window: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            seq: AtomicU64::new(0),
            sender,
            recent: Mutex::new(RingBuffer::new(replay_window.max(1))),
        }
    }

    pub fn publish(&self, input: EventRecordInput) -> EventRecord {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let record = EventRecord {
            seq,
            ts: Utc::now(),
            request_id: input.request_id,
            key_index: input.key_index,
            path: input.path,
            original_model: input.original_model,
            mapped_model: input.mapped_model,
            status: input.status,
            status_code: input.status_code,
            latency_ms: input.latency_ms,
            input_tokens: input.input_tokens,
            output_tokens: input.output_tokens,
            cost: input.cost,
            routing_decision: input.routing_decision,
            error_kind: input.error_kind,
        };
        self.recent.lock().push(record.clone());
        // No receivers is not an error condition on the hot request path.
        let _ = self.sender.send(record.clone());
        record
    }

    pub fn subscribe(&self) -> Subscriber {
        Subscriber {
            rx: self.sender.subscribe(),
            dropped_total: 0,
        }
    }

    /// Snapshot of the last `k` published records, oldest first, for the SSE
    /// `init` frame.
    pub fn recent(&self, k: usize) -> Vec<EventRecord> {
        let recent = self.recent.lock();
        recent.iter().rev().take(k).rev().cloned().collect()
    }

    pub fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }
}

pub struct Subscriber {
    rx: broadcast::Receiver<EventRecord>,
    dropped_total: u64,
}

#[derive(Debug)]
pub enum SubscriberEvent {
    Record(EventRecord),
    Dropped(u64),
    Closed,
}

impl Subscriber {
    pub async fn recv(&mut self) -> SubscriberEvent {
        match self.rx.recv().await {
            Ok(record) => SubscriberEvent::Record(record),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                self.dropped_total += skipped;
                SubscriberEvent::Dropped(skipped)
            }
            Err(broadcast::error::RecvError::Closed) => SubscriberEvent::Closed,
        }
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }
}
