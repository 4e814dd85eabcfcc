//! Health endpoint integration tests.

mod common;

use axum::http::StatusCode;
use common::{TestHarness, VALID_KEY};
use serde_json::json;

#[tokio::test]
async fn health_check_returns_ok() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn health_check_returns_json() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/api/v1/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "llm-balance");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn ready_probe() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/api/v1/health/ready").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn detailed_health_reports_cache_stats() {
    let harness = TestHarness::new().await;
    harness
        .mock_deepseek(VALID_KEY, common::deepseek_payload("10.00", "0", "10.00"))
        .await;

    for _ in 0..2 {
        harness
            .server
            .post("/api/v1/balance/check")
            .json(&json!({ "apiKey": VALID_KEY }))
            .await
            .assert_status_ok();
    }

    let response = harness.server.get("/api/v1/health/detailed").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["uptimeSeconds"].is_u64());
    assert_eq!(body["cache"]["entries"], 1);
    assert_eq!(body["cache"]["hits"], 1);
    assert_eq!(body["cache"]["misses"], 1);
    assert_eq!(body["providers"].as_array().unwrap().len(), 2);
    assert_eq!(body["providers"][0]["name"], "deepseek");
    assert_eq!(body["providers"][0]["hasFallback"], true);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/api/v1/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(body["requestId"].is_string());
}

#[tokio::test]
async fn every_response_carries_request_id() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/health").await;

    assert!(response.headers().get("x-request-id").is_some());
}
