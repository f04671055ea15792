//! `GET /backpressure` — the admission gate's own snapshot, unwrapped.

use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use gateway_admission::AdmissionSnapshot;

pub async fn backpressure(State(state): State<SharedState>) -> Json<AdmissionSnapshot> {
    Json(state.admission.snapshot())
}
