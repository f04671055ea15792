//! `GET /traces` and `GET /traces/{id}`.
//!
//! No separate trace store exists: both endpoints read
//! `gateway_events::EventBus::recent`, the same bounded window `/events`'
//! `init` frame already replays from. The bus is constructed with a
//! `replay_window` sized for this purpose, not just SSE catch-up (see
//! `main`), so a trace lookup only misses once a request has aged out of
//! that window — consistent with never persisting per-request traces beyond
//! a bounded in-memory window.

use crate::state::SharedState;
use axum::extract::{Path, State};
use gateway_core::GatewayError;
use gateway_events::EventRecord;
use axum::Json;

const TRACE_SCAN_LIMIT: usize = 2000;

pub async fn list(State(state): State<SharedState>) -> Json<Vec<EventRecord>> {
    Json(state.events.recent(TRACE_SCAN_LIMIT))
}

pub async fn by_id(State(state): State<SharedState>, Path(id): Path<String>) -> Result<Json<EventRecord>, GatewayError> {
    state
        .events
        .recent(TRACE_SCAN_LIMIT)
        .into_iter()
        .find(|record| record.request_id == id)
        .map(Json)
        .ok_or(GatewayError::NotFound)
}
