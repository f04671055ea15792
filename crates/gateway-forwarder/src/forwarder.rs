//! Per-attempt and per-request forwarding: the thing that actually talks to
//! the upstream.
//!
//! The HTTP client is `reqwest`, the same choice an LLM gateway in this
//! corpus makes for its upstream dispatch; the response body streams back to
//! the client through `axum::body::Body` so a long completion is never
//! buffered in memory.

use crate::classifier::{classify, outcome_from_reqwest_error, AttemptOutcome};
use crate::headers::{ensure_request_id, is_hop_by_hop, rewrite_for_upstream};
use crate::retry::{AttemptRecord, RetryDecision, RetryPolicy};
use crate::routing::ModelRouter;
use crate::timeout::{AttemptClock, AttemptDeadlines};
use axum::body::Body;
use bytes::Bytes;
use futures_util::StreamExt;
use gateway_core::GatewayError;
use gateway_credential::CredentialId;
use gateway_pool::{Pool, SelectOutcome};
use http::{HeaderMap, Method};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    pub upstream_base_url: String,
    pub deadlines: AttemptDeadlines,
    pub store_body_size_limit: usize,
}

/// One inbound request, already admitted and header-checked.
pub struct ForwardRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub model: Option<String>,
}

/// What the forwarder produced: a response to relay to the client plus the
/// attempt history for the stats aggregator and event bus.
pub struct ForwardOutcome {
    pub response: axum::response::Response,
    pub attempts: Vec<AttemptRecord>,
    pub mapped_model: Option<String>,
}

/// Ends the attempt loop without a response to relay as a success. When the
/// last attempt actually reached upstream and got back a response (a
/// non-retriable status, or the last of a retriable run that exhausted the
/// retry budget), `upstream_response` carries that response's status,
/// selected headers, and streamed body so the caller can forward it
/// verbatim rather than synthesizing a JSON error body. Errors
/// that never produced a response (timeout, hangup, network failure, a
/// cold pool) leave it `None`.
pub struct ForwardFailure {
    pub error: GatewayError,
    pub upstream_response: Option<axum::response::Response>,
    /// The credential the failing attempt ran against, for per-credential
    /// stats — `None` when no credential was ever selected (`POOL_COLD`).
    pub credential_id: Option<CredentialId>,
}

pub struct Forwarder {
    client: Client,
    config: ForwarderConfig,
    pool: Arc<Mutex<Pool>>,
    router: Arc<dyn ModelRouter>,
    retry_policy: RetryPolicy,
}

impl Forwarder {
    pub fn new(
        client: Client,
        config: ForwarderConfig,
        pool: Arc<Mutex<Pool>>,
        router: Arc<dyn ModelRouter>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            config,
            pool,
            router,
            retry_policy,
        }
    }

    /// Drives the full per-request attempt loop: select a credential, attempt,
    /// classify, retry against a fresh credential if warranted, up to the
    /// retry policy's limits.
    pub async fn forward(&self, mut request: ForwardRequest) -> Result<ForwardOutcome, ForwardFailure> {
        let request_id = ensure_request_id(&mut request.headers);
        let replayable = request.body.len() <= self.config.store_body_size_limit;

        let mapped = request
            .model
            .as_deref()
            .and_then(|m| self.router.resolve(m));
        let mapped_model = mapped.as_ref().map(|m| m.mapped_model.clone());

        let mut attempts = Vec::new();
        let mut attempt_number = 0u32;

        loop {
            attempt_number += 1;
            let key_index = {
                let mut pool = self.pool.lock().await;
                match pool.select() {
                    SelectOutcome::Selected(idx) => idx,
                    SelectOutcome::Cold { retry_after_ms } => {
                        return Err(ForwardFailure {
                            error: GatewayError::PoolCold { retry_after_ms },
                            upstream_response: None,
                            credential_id: None,
                        })
                    }
                }
            };

            let (secret, credential_id) = {
                let pool = self.pool.lock().await;
                let credential = pool.credential(key_index).expect("just selected");
                (credential.secret().to_string(), credential.id())
            };

            let started = Instant::now();
            let attempt_result = self
                .run_one_attempt(&request, &request_id, &secret, mapped_model.as_deref())
                .await;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

            match attempt_result {
                Ok(response) => {
                    self.pool.lock().await.record_success(key_index, latency_ms);
                    self.retry_policy.record_success();
                    attempts.push(AttemptRecord {
                        key_index,
                        credential_id,
                        status_code: Some(response.status().as_u16()),
                        latency_ms,
                        error_kind: None,
                    });
                    return Ok(ForwardOutcome {
                        response,
                        attempts,
                        mapped_model,
                    });
                }
                Err(PreByteFailure { outcome, upstream_response }) => {
                    let err = classify(&outcome);
                    let (status_code, error_kind, is_429, retriable) = match (&err, &outcome) {
                        (Some(e), AttemptOutcome::Status(s)) => {
                            (Some(*s), Some(e.code()), *s == 429, e.is_retriable())
                        }
                        (Some(e), _) => (None, Some(e.code()), false, e.is_retriable()),
                        (None, AttemptOutcome::Status(s)) => (Some(*s), None, false, false),
                        (None, _) => (None, None, false, false),
                    };
                    self.pool
                        .lock()
                        .await
                        .record_failure(key_index, latency_ms, is_429);
                    attempts.push(AttemptRecord {
                        key_index,
                        credential_id,
                        status_code,
                        latency_ms,
                        error_kind,
                    });

                    match self.retry_policy.decide(attempt_number, retriable, replayable) {
                        RetryDecision::Retry { after } => {
                            // Dropping the unread response here closes this
                            // attempt's connection; the next iteration opens
                            // a fresh one against a (likely different)
                            // credential.
                            drop(upstream_response);
                            tokio::time::sleep(after.0).await;
                            continue;
                        }
                        RetryDecision::GiveUp => {
                            let error = err.unwrap_or(GatewayError::UpstreamNetwork {
                                message: "attempt failed with no classifiable error".into(),
                            });
                            return Err(ForwardFailure {
                                error,
                                upstream_response,
                                credential_id: Some(credential_id),
                            });
                        }
                    }
                }
            }
        }
    }

    /// `mapped_model` is recorded on the envelope by the caller; the JSON
    /// body rewrite for a mapped model happens above this crate, which only
    /// forwards whatever bytes it was given.
    async fn run_one_attempt(
        &self,
        request: &ForwardRequest,
        request_id: &str,
        secret: &str,
        _mapped_model: Option<&str>,
    ) -> Result<axum::response::Response, PreByteFailure> {
        let mut headers = request.headers.clone();
        rewrite_for_upstream(&mut headers, secret);

        let url = format!(
            "{}{}",
            self.config.upstream_base_url.trim_end_matches('/'),
            request.path
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .body(request.body.clone());
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        builder = builder.header("x-request-id", request_id);

        let clock = AttemptClock::start(self.config.deadlines);

        let response = match tokio::time::timeout(clock.next_wait(), builder.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return Err(PreByteFailure {
                    outcome: outcome_from_reqwest_error(&err),
                    upstream_response: None,
                })
            }
            Err(_) => {
                return Err(PreByteFailure {
                    outcome: AttemptOutcome::Timeout,
                    upstream_response: None,
                })
            }
        };

        let status = response.status();
        let built = Self::stream_upstream_response(status, response, clock);

        if !status.is_success() {
            return Err(PreByteFailure {
                outcome: AttemptOutcome::Status(status.as_u16()),
                upstream_response: built.ok(),
            });
        }

        built.map_err(|_| PreByteFailure {
            outcome: AttemptOutcome::Network("failed to build response".into()),
            upstream_response: None,
        })
    }

    /// Builds the client-facing response from a raw upstream response,
    /// relaying status, selected headers (hop-by-hop ones stripped), and a
    /// streamed body bounded by the same idle/total deadlines as the read
    /// that produced it. Used for both successful and failing attempts —
    /// a non-retriable or retry-exhausted failure is forwarded through this
    /// same path so the client sees the upstream's own bytes, not a
    /// synthesized error body.
    fn stream_upstream_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
        clock: AttemptClock,
    ) -> Result<axum::response::Response, ()> {
        let response_headers = response.headers().clone();
        let stream = response.bytes_stream();

        let body_stream = futures_util::stream::unfold(
            (stream, clock),
            |(mut stream, mut clock)| async move {
                let wait = clock.next_wait();
                match tokio::time::timeout(wait, stream.next()).await {
                    Ok(Some(Ok(chunk))) => {
                        clock.record_chunk();
                        Some((Ok::<_, std::io::Error>(chunk), (stream, clock)))
                    }
                    _ => None,
                }
            },
        );

        let mut builder = axum::response::Response::builder().status(status.as_u16());
        if let Some(existing) = builder.headers_mut() {
            for (name, value) in response_headers.iter() {
                if !is_hop_by_hop(name.as_str()) {
                    existing.insert(name, value.clone());
                }
            }
        }
        builder.body(Body::from_stream(body_stream)).map_err(|_| ())
    }
}

struct PreByteFailure {
    outcome: AttemptOutcome,
    upstream_response: Option<axum::response::Response>,
}
