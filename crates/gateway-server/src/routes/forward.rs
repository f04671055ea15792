//! `POST /v1/messages` and `POST /v1/chat/completions`: the admitted,
//! forwarded, retried, and accounted-for request path.

use crate::state::SharedState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use gateway_core::error::with_request_id;
use gateway_events::{EventRecordInput, EventStatus};
use gateway_forwarder::headers::ensure_request_id;
use gateway_forwarder::{ForwardFailure, ForwardOutcome, ForwardRequest};
use serde_json::Value;
use std::time::Instant;

pub async fn messages(state: State<SharedState>, headers: HeaderMap, body: Bytes) -> Response {
    handle(state, "/v1/messages", headers, body).await
}

pub async fn chat_completions(state: State<SharedState>, headers: HeaderMap, body: Bytes) -> Response {
    handle(state, "/v1/chat/completions", headers, body).await
}

async fn handle(State(state): State<SharedState>, path: &str, mut headers: HeaderMap, body: Bytes) -> Response {
    let request_id = ensure_request_id(&mut headers);

    if state.is_paused() {
        return with_request_id(
            gateway_core::GatewayError::Backpressure { retry_after_ms: 1000 },
            request_id,
        );
    }

    if let Err(err) = state.admission.check_body_size(body.len()) {
        return with_request_id(gateway_core::GatewayError::from(err), request_id);
    }

    let permit = match state.admission.acquire().await {
        Ok(permit) => permit,
        Err(err) => {
            match err {
                gateway_admission::AdmissionError::QueueTimeout => state.stats.record_queue_timeout(),
                gateway_admission::AdmissionError::Backpressure { .. } => state.stats.record_backpressure_rejection(),
                gateway_admission::AdmissionError::RequestTooLarge { .. } => {}
            }
            return with_request_id(gateway_core::GatewayError::from(err), request_id);
        }
    };

    let model = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("model").and_then(Value::as_str).map(str::to_string));

    let request = ForwardRequest {
        method: Method::POST,
        path: path.to_string(),
        headers,
        body,
        model: model.clone(),
    };

    let started = Instant::now();
    let outcome = state.forwarder.forward(request).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    state.admission.record_completion();
    drop(permit);

    match outcome {
        Ok(forward_outcome) => {
            finish_success(&state, path, &request_id, model, forward_outcome, latency_ms).await
        }
        Err(err) => finish_error(&state, path, &request_id, model, err, latency_ms),
    }
}

async fn finish_success(
    state: &SharedState,
    path: &str,
    request_id: &str,
    original_model: Option<String>,
    outcome: ForwardOutcome,
    total_latency_ms: f64,
) -> Response {
    let ForwardOutcome { response, attempts, mapped_model } = outcome;
    let key_index = attempts.last().map(|a| a.key_index).unwrap_or(0);
    let credential_id = attempts.last().map(|a| a.credential_id);
    let status_code = response.status().as_u16();

    if let Some(credential_id) = credential_id {
        state.stats.record_attempt(credential_id, total_latency_ms, None, false);
    }

    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let (response, input_tokens, output_tokens, cost) = if content_type.starts_with("text/event-stream") {
        (response, None, None, None)
    } else {
        let billed_model = mapped_model.clone().or_else(|| original_model.clone());
        buffer_and_extract(state, response, billed_model.as_deref()).await
    };

    if let Some(amount) = cost {
        state.stats.record_cost(amount);
    }

    state.events.publish(EventRecordInput {
        request_id: request_id.to_string(),
        key_index,
        path: path.to_string(),
        original_model: original_model.unwrap_or_default(),
        mapped_model,
        status: EventStatus::Ok,
        status_code: Some(status_code),
        latency_ms: total_latency_ms,
        input_tokens,
        output_tokens,
        cost,
        routing_decision: if attempts.len() > 1 { "retried".to_string() } else { "forwarded".to_string() },
        error_kind: None,
    });

    response
}

/// On a non-retriable or retry-exhausted upstream failure, `failure.upstream_response`
/// carries the upstream's own status/headers/body (see `ForwardFailure`); that is
/// relayed to the client unchanged instead of the synthetic JSON body
/// `with_request_id` builds for gateway-generated errors (admission, auth, pool-cold,
/// transport failures with no response to show).
fn finish_error(
    state: &SharedState,
    path: &str,
    request_id: &str,
    original_model: Option<String>,
    failure: ForwardFailure,
    total_latency_ms: f64,
) -> Response {
    let ForwardFailure { error: err, upstream_response, credential_id } = failure;
    let status_code = upstream_response.as_ref().map(|r| r.status().as_u16());

    match credential_id {
        Some(credential_id) => state.stats.record_attempt(
            credential_id,
            total_latency_ms,
            Some(err.code()),
            matches!(err, gateway_core::GatewayError::Upstream429 { .. }),
        ),
        None => state.stats.record_failure_without_credential(),
    }

    state.events.publish(EventRecordInput {
        request_id: request_id.to_string(),
        key_index: 0,
        path: path.to_string(),
        original_model: original_model.unwrap_or_default(),
        mapped_model: None,
        status: EventStatus::Error,
        status_code,
        latency_ms: total_latency_ms,
        input_tokens: None,
        output_tokens: None,
        cost: None,
        routing_decision: String::new(),
        error_kind: Some(err.code()),
    });

    match upstream_response {
        Some(mut response) => {
            if let Ok(value) = axum::http::HeaderValue::from_str(request_id) {
                response
                    .headers_mut()
                    .insert(axum::http::HeaderName::from_static("x-request-id"), value);
            }
            response
        }
        None => with_request_id(err, request_id),
    }
}

/// Buffers a non-streaming upstream response to pull `usage.{prompt,completion}_tokens`
/// out of the JSON body, bounded by `storeBodySizeLimit`. If the body exceeds
/// that bound the bytes already consumed by `to_bytes` cannot be recovered, so
/// the client gets an empty body rather than a truncated one — the same
/// "past the stored-body bound, not replayable" limit the forwarder already
/// applies to request bodies.
async fn buffer_and_extract(
    state: &SharedState,
    response: Response,
    model: Option<&str>,
) -> (Response, Option<u64>, Option<u64>, Option<f64>) {
    let (parts, body) = response.into_parts();
    let limit = state.config.concurrency.store_body_size_limit;
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                Response::from_parts(parts, axum::body::Body::empty()),
                None,
                None,
                None,
            )
        }
    };

    let (input_tokens, output_tokens) = serde_json::from_slice::<Value>(&bytes)
        .ok()
        .map(|v| {
            let usage = v.get("usage");
            let input = usage.and_then(|u| u.get("prompt_tokens")).and_then(Value::as_u64);
            let output = usage.and_then(|u| u.get("completion_tokens")).and_then(Value::as_u64);
            (input, output)
        })
        .unwrap_or((None, None));

    let cost = match (input_tokens, output_tokens, model) {
        (Some(i), Some(o), Some(m)) => Some(state.cost_model.estimate(m, i, o)),
        _ => None,
    };

    let response = Response::from_parts(parts, axum::body::Body::from(bytes));
    (response, input_tokens, output_tokens, cost)
}
