//! `GET /logs`.

use crate::state::SharedState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    200
}

pub async fn logs(State(state): State<SharedState>, Query(query): Query<LogsQuery>) -> Json<Vec<String>> {
    Json(state.logs.recent(query.limit))
}
