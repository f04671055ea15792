//! The completion record published once per forwarded request.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Ok,
    Error,
}

/// Published by the forwarder's completion callback once a request finishes,
/// successfully or not. `seq` is assigned by [`crate::bus::EventBus`] at
/// publish time, not by the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub request_id: String,
    pub key_index: usize,
    pub path: String,
    pub original_model: String,
    pub mapped_model: Option<String>,
    pub status: EventStatus,
    pub status_code: Option<u16>,
    pub latency_ms: f64,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost: Option<f64>,
    pub routing_decision: String,
    pub error_kind: Option<&'static str>,
}

/// Fields the caller supplies; `seq` and `ts` are filled in on publish.
#[derive(Debug, Clone)]
pub struct EventRecordInput {
    pub request_id: String,
    pub key_index: usize,
    pub path: String,
    pub original_model: String,
    pub mapped_model: Option<String>,
    pub status: EventStatus,
    pub status_code: Option<u16>,
    pub latency_ms: f64,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cost: Option<f64>,
    pub routing_decision: String,
    pub error_kind: Option<&'static str>,
}
