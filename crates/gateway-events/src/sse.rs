//! SSE framing for `/events` and `/requests/stream`, grounded on
//! `flowtrace-server::api::realtime::sse_traces` and its WebSocket sibling's
//! ping/pong `tokio::select!` loop.

use crate::bus::{EventBus, SubscriberEvent};
use crate::record::EventRecord;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::{interval, Instant};

pub struct SseConfig {
    pub heartbeat_interval: Duration,
    pub client_timeout: Duration,
    pub replay_size: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    seq: u64,
    ts: chrono::DateTime<chrono::Utc>,
    schema_version: u32,
    client_id: &'a str,
    recent_requests: Vec<EventRecord>,
}

#[derive(Serialize)]
struct DroppedFrame {
    dropped: u64,
}

#[derive(Serialize)]
struct HeartbeatFrame {
    ts: chrono::DateTime<chrono::Utc>,
}

/// Builds the stream for one SSE connection: an `init` snapshot, then live
/// records, `dropped` markers on broadcast lag, and `heartbeat` frames when
/// idle. A subscriber still lagging after `client_timeout` is disconnected.
pub fn sse_stream(
    bus: &EventBus,
    client_id: String,
    config: SseConfig,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let mut subscriber = bus.subscribe();
    let init = InitFrame {
        kind: "init",
        seq: bus.current_seq(),
        ts: chrono::Utc::now(),
        schema_version: 1,
        client_id: &client_id,
        recent_requests: bus.recent(config.replay_size),
    };
    let init_json = serde_json::to_string(&init).unwrap_or_else(|_| "{}".to_string());

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data(init_json));

        let mut last_activity = Instant::now();
        let mut heartbeat = interval(config.heartbeat_interval);
        heartbeat.tick().await; // first tick fires immediately; consume it

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if last_activity.elapsed() >= config.heartbeat_interval {
                        let frame = HeartbeatFrame { ts: chrono::Utc::now() };
                        let json = serde_json::to_string(&frame).unwrap_or_else(|_| "{}".to_string());
                        yield Ok(Event::default().event("heartbeat").data(json));
                        last_activity = Instant::now();
                    }
                }
                event = subscriber.recv() => {
                    match event {
                        SubscriberEvent::Record(record) => {
                            let json = serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string());
                            yield Ok(Event::default().event("request-complete").data(json));
                            last_activity = Instant::now();
                        }
                        SubscriberEvent::Dropped(skipped) => {
                            let json = serde_json::to_string(&DroppedFrame { dropped: skipped }).unwrap_or_else(|_| "{}".to_string());
                            yield Ok(Event::default().event("dropped").data(json));
                            if last_activity.elapsed() >= config.client_timeout {
                                break;
                            }
                        }
                        SubscriberEvent::Closed => break,
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
