//! Scenario 5: a request body over `maxBodySize` is rejected with 413
//! before any upstream call, and the rejection isn't counted as a request.

#[path = "common/mod.rs"]
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{build, HarnessConfig};
use tower::ServiceExt;
use wiremock::MockServer;

#[tokio::test]
async fn a_body_over_the_limit_is_rejected_without_calling_upstream() {
    let upstream = MockServer::start().await;

    let mut cfg = HarnessConfig::new(upstream.uri());
    cfg.max_body_size = 100;
    let harness = build(cfg).await;

    let oversized = vec![b'a'; 200];
    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .body(Body::from(oversized))
        .unwrap();

    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(upstream.received_requests().await.unwrap().len(), 0);

    let credential_ids = harness.state.pool.lock().await.credential_ids();
    let snapshot = harness.state.stats.stats_snapshot(&credential_ids);
    assert_eq!(snapshot.global.total_requests, 0);
}

#[tokio::test]
async fn a_body_exactly_at_the_limit_is_accepted() {
    let upstream = MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
        })))
        .mount(&upstream)
        .await;

    let mut cfg = HarnessConfig::new(upstream.uri());
    cfg.max_body_size = 100;
    let harness = build(cfg).await;

    let exact = vec![b'a'; 100];
    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .body(Body::from(exact))
        .unwrap();

    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
