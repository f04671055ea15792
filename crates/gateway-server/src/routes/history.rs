//! `GET /history?minutes=N`.

use crate::history::HistoryResponse;
use crate::state::SharedState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_minutes")]
    minutes: u64,
}

fn default_minutes() -> u64 {
    15
}

pub async fn history(State(state): State<SharedState>, Query(query): Query<HistoryQuery>) -> Json<HistoryResponse> {
    Json(state.history.query(query.minutes))
}
