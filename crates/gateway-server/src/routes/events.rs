//! `GET /events` (dashboard state) and `GET /requests/stream` (request
//! completions) — both served by the same SSE framing, distinguished only by
//! the client id embedded in the `init` frame.

use crate::state::SharedState;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use gateway_events::{sse_stream, SseConfig};
use std::convert::Infallible;

fn config(state: &SharedState) -> SseConfig {
    SseConfig {
        heartbeat_interval: state.config.telemetry.heartbeat_interval(),
        client_timeout: state.config.telemetry.heartbeat_interval() * 4,
        replay_size: state.config.telemetry.replay_size,
    }
}

pub async fn dashboard_stream(
    State(state): State<SharedState>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let cfg = config(&state);
    sse_stream(&state.events, "dashboard".to_string(), cfg)
}

pub async fn requests_stream(
    State(state): State<SharedState>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let cfg = config(&state);
    sse_stream(&state.events, "requests".to_string(), cfg)
}
