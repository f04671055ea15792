//! `GET /health` — liveness, credential counts, and a backpressure overview.

use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use gateway_credential::CircuitState;
use gateway_stats::{HealthSnapshot, QueueSnapshot};

pub async fn health(State(state): State<SharedState>) -> Json<HealthSnapshot> {
    let pool = state.pool.lock().await;
    let total_keys = pool.len();
    let healthy_keys = pool
        .slots()
        .iter()
        .filter(|s| !s.draining && s.credential.state() != CircuitState::Open)
        .count();
    drop(pool);

    let admission = state.admission.snapshot();
    let queue = QueueSnapshot { current: admission.queue_current, max: admission.queue_max };

    Json(HealthSnapshot::new(healthy_keys, total_keys, state.uptime_secs(), queue))
}
