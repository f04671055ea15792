//! Route registration: one `Router::new().route(...)` assembly, mirroring
//! how `agentreplay_server::api` wires its own flat endpoint list.

pub mod backpressure;
pub mod control;
pub mod events;
pub mod forward;
pub mod health;
pub mod history;
pub mod logs;
pub mod models;
pub mod stats;
pub mod traces;
pub mod version;

use crate::state::SharedState;
use axum::routing::{get, post};
use axum::Router;

pub fn build(state: SharedState) -> Router {
    Router::new()
        .route("/v1/messages", post(forward::messages))
        .route("/v1/chat/completions", post(forward::chat_completions))
        .route("/health", get(health::health))
        .route("/stats", get(stats::stats))
        .route("/stats/cost", get(stats::cost))
        .route("/models", get(models::models))
        .route("/history", get(history::history))
        .route("/traces", get(traces::list))
        .route("/traces/:id", get(traces::by_id))
        .route("/logs", get(logs::logs))
        .route("/backpressure", get(backpressure::backpressure))
        .route("/reload", post(control::reload))
        .route("/control/pause", post(control::pause))
        .route("/control/resume", post(control::resume))
        .route("/control/clear-logs", post(control::clear_logs))
        .route("/events", get(events::dashboard_stream))
        .route("/requests/stream", get(events::requests_stream))
        .route("/version", get(version::version))
        .with_state(state)
}
