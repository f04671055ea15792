//! Scenario 1: a single successful request against one credential produces
//! one 200 response, one recorded request, one published event, and a
//! positive cost estimate.

#[path = "common/mod.rs"]
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{build, HarnessConfig};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn successful_request_is_accounted_for_end_to_end() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        })))
        .mount(&upstream)
        .await;

    let mut cfg = HarnessConfig::new(upstream.uri());
    cfg.keys = vec!["k1", "k2"];
    let harness = build(cfg).await;

    let body = json!({
        "model": "claude-sonnet-4-5",
        "max_tokens": 50,
        "messages": [{"role": "user", "content": "hi"}]
    });
    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let credential_ids = harness.state.pool.lock().await.credential_ids();
    let snapshot = harness.state.stats.stats_snapshot(&credential_ids);
    assert_eq!(snapshot.global.total_requests, 1);
    assert_eq!(snapshot.global.total_successes, 1);

    let recent = harness.state.events.recent(10);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].status_code, Some(200));
    assert_eq!(recent[0].input_tokens, Some(10));
    assert_eq!(recent[0].output_tokens, Some(5));

    let cost = harness.state.stats.cost_snapshot();
    assert!(cost.cost_usd > 0.0);
}
