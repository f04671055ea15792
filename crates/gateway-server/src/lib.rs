//! HTTP front-end: route handlers, shared application state, admin-token
//! gating, the in-memory history sampler, the cost estimator, and the
//! in-memory log ring. The CLI entry point in `main.rs` wires all of this
//! together with the component crates it depends on.

pub mod auth;
pub mod cost_model;
pub mod history;
pub mod logs;
pub mod routes;
pub mod state;

pub use state::{AppState, SharedState};
