//! `POST /reload` and `POST /control/*` — all admin-token gated.

use crate::auth::require_admin;
use crate::state::SharedState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::GatewayError;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReloadResponse {
    success: bool,
    added: usize,
    removed: usize,
    total: usize,
}

pub async fn reload(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(err) = require_admin(&state, &headers) {
        return err.into_response();
    }

    let loaded = match gateway_config::load_credentials(&state.credentials_path, &state.config.pool) {
        Ok(loaded) => loaded,
        Err(_) => return GatewayError::NotFound.into_response(),
    };

    let mut pool = state.pool.lock().await;
    let summary = gateway_pool::apply_reload(&mut pool, &loaded.specs, state.config.telemetry.latency_window);
    let total = pool.len();
    let ids = pool.credential_ids();
    drop(pool);

    state.stats.sync_credentials(&ids);

    Json(ReloadResponse {
        success: true,
        added: summary.added,
        removed: summary.removed,
        total,
    })
    .into_response()
}

pub async fn pause(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(err) = require_admin(&state, &headers) {
        return err.into_response();
    }
    state.set_paused(true);
    Json(serde_json::json!({ "paused": true })).into_response()
}

pub async fn resume(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(err) = require_admin(&state, &headers) {
        return err.into_response();
    }
    state.set_paused(false);
    Json(serde_json::json!({ "paused": false })).into_response()
}

pub async fn clear_logs(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Err(err) = require_admin(&state, &headers) {
        return err.into_response();
    }
    state.logs.clear();
    Json(serde_json::json!({ "cleared": true })).into_response()
}
