//! `GET /stats` and `GET /stats/cost`.

use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use gateway_stats::{CostStatsSnapshot, StatsSnapshot};

pub async fn stats(State(state): State<SharedState>) -> Json<StatsSnapshot> {
    let ids = state.pool.lock().await.credential_ids();
    Json(state.stats.stats_snapshot(&ids))
}

pub async fn cost(State(state): State<SharedState>) -> Json<CostStatsSnapshot> {
    Json(state.stats.cost_snapshot())
}
