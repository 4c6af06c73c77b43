// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway route tests driven in-process through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use chatline_gateway::{GatewayState, router};
use chatline_test_utils::{Ending, MockGenerationBackend, TestHarness};

const GENERAL_TEXT: &str = "Tell me about the history of ancient Rome and its many emperors";

fn app_with(harness: &TestHarness) -> Router {
    let render: chatline_gateway::MetricsRender =
        Arc::new(|| "chatline_requests_total 1\n".to_string());
    router(GatewayState::new(harness.orchestrator.clone(), Some(render)))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Event names in order of appearance.
fn event_names(sse: &str) -> Vec<&str> {
    sse.lines()
        .filter_map(|line| line.strip_prefix("event:").map(str::trim))
        .collect()
}

#[tokio::test]
async fn health_reports_pool_and_components() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app_with(&harness);

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pool"]["capacity"], 3);
    assert_eq!(body["pool"]["in_use"], 0);
    assert_eq!(body["cache"]["capacity"], 100);
    assert_eq!(body["components"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn chat_stream_emits_start_deltas_and_one_stop() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app_with(&harness);

    let response = app
        .oneshot(post_json(
            "/api/chat/stream",
            json!({ "message": GENERAL_TEXT, "lang": "en" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let sse = body_text(response).await;
    assert_eq!(
        event_names(&sse),
        vec!["message_start", "text_delta", "text_delta", "message_stop"]
    );
    assert!(sse.contains(r#"{"text":"mock "}"#));
    assert!(sse.contains(r#"{"status":"completed"}"#));
}

#[tokio::test]
async fn quick_reply_streams_canned_text() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app_with(&harness);

    let response = app
        .oneshot(post_json("/api/chat/stream", json!({ "message": "hello" })))
        .await
        .unwrap();

    let sse = body_text(response).await;
    assert_eq!(
        event_names(&sse),
        vec!["message_start", "text_delta", "message_stop"]
    );
    assert!(sse.contains("How can I help you today?"));
    assert_eq!(harness.generator.calls(), 0);
}

#[tokio::test]
async fn empty_message_is_a_bad_request() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app_with(&harness);

    let response = app
        .oneshot(post_json("/api/chat/stream", json!({ "message": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["retryable"], false);
    assert_eq!(harness.generator.calls(), 0);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app_with(&harness);

    let response = app
        .oneshot(post_json("/api/chat/stream", json!({ "text": "wrong field" })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn backend_failure_ends_with_error_event() {
    let harness = TestHarness::builder()
        .with_generator(MockGenerationBackend::new().failing_on_start("model not found"))
        .build()
        .await
        .unwrap();
    let app = app_with(&harness);

    let response = app
        .oneshot(post_json("/api/chat/stream", json!({ "message": GENERAL_TEXT })))
        .await
        .unwrap();

    let sse = body_text(response).await;
    assert_eq!(event_names(&sse), vec!["message_start", "error"]);
    assert!(sse.contains(r#""kind":"generation""#));
}

#[tokio::test]
async fn stop_endpoint_cancels_a_streaming_request() {
    let harness = TestHarness::builder()
        .with_generator(MockGenerationBackend::with_deltas(&[]).ending_with(Ending::Hang))
        .build()
        .await
        .unwrap();
    let app = app_with(&harness);

    let response = app
        .clone()
        .oneshot(post_json("/api/chat/stream", json!({ "message": GENERAL_TEXT })))
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();

    let first = body.next().await.unwrap().unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    let data = first
        .lines()
        .find_map(|line| line.strip_prefix("data:").map(str::trim))
        .unwrap();
    let request_id = serde_json::from_str::<Value>(data).unwrap()["request_id"]
        .as_str()
        .unwrap()
        .to_string();

    let stop = app
        .clone()
        .oneshot(post_empty(&format!("/api/chat/{request_id}/stop")))
        .await
        .unwrap();
    assert_eq!(stop.status(), StatusCode::OK);

    let mut rest = String::new();
    while let Some(frame) = body.next().await {
        rest.push_str(&String::from_utf8(frame.unwrap().to_vec()).unwrap());
    }
    assert_eq!(event_names(&rest), vec!["message_stop"]);
    assert!(rest.contains(r#"{"status":"cancelled"}"#));
    harness.reports(1).await;

    let again = app
        .oneshot(post_empty(&format!("/api/chat/{request_id}/stop")))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clear_cache_reports_removed_entries() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.send_text(GENERAL_TEXT).await.unwrap();
    let app = app_with(&harness);

    let response = app.oneshot(post_empty("/api/clear-cache")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["cleared"], 1);
    assert_eq!(harness.orchestrator.cache_stats().entries, 0);
}

#[tokio::test]
async fn metrics_render_when_enabled() {
    let harness = TestHarness::builder().build().await.unwrap();

    let enabled = app_with(&harness)
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(enabled.status(), StatusCode::OK);
    assert!(body_text(enabled).await.contains("chatline_requests_total"));

    let disabled = router(GatewayState::new(harness.orchestrator.clone(), None))
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(disabled.status(), StatusCode::NOT_FOUND);
}
