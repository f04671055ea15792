//! `GET /models` — the live routing table, for dashboards and operators who
//! want to see what a model name currently maps to without reading the file
//! on disk.

use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use gateway_routing::RoutingConfigV2;

pub async fn models(State(state): State<SharedState>) -> Json<RoutingConfigV2> {
    Json(state.router.snapshot())
}
