//! Integration tests for the HTTP long-poll gateway.

mod helpers;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

/// Poll until a broadcast or private message arrives, skipping system events.
async fn next_annotation(app: &helpers::TestApp, session: &str) -> serde_json::Value {
    for _ in 0..10 {
        let response = app.request("GET", "/api/get?timeout=1", None, Some(session)).await;
        assert_eq!(response.status, StatusCode::OK);
        let data = &response.body["data"];
        if data["status"] == "message" {
            let kind = &data["message"]["kind"];
            if kind == "broadcast" || kind == "private" {
                return data["message"].clone();
            }
        }
    }
    panic!("no annotation delivered");
}

#[tokio::test]
async fn test_login_send_and_poll() {
    let app = helpers::TestApp::new();
    let alice = app.login("alice", "a@x").await;
    let bob = app.login("bob", "b@y").await;

    let response = app
        .request("POST", "/api/send", Some(json!({ "text": "hello" })), Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["accepted"], true);

    let message = next_annotation(&app, &bob).await;
    assert_eq!(message["payload"]["text"], "hello");
    assert_eq!(message["origin"]["name"], "alice");
    assert!(message["origin"].get("id").is_none());
}

#[tokio::test]
async fn test_duplicate_login_conflicts() {
    let app = helpers::TestApp::new();
    app.login("alice", "a@x").await;

    let response = app
        .request(
            "POST",
            "/api/login",
            Some(json!({ "name": "alice", "address": "other@x" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_blank_login_is_rejected() {
    let app = helpers::TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/login",
            Some(json!({ "name": "  ", "address": "a@x" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_without_session_is_unauthorized() {
    let app = helpers::TestApp::new();
    let response = app
        .request("POST", "/api/send", Some(json!("x")), Some("not-a-session"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_poll_unknown_session_is_done() {
    let app = helpers::TestApp::new();
    let response = app
        .request(
            "GET",
            "/api/get",
            None,
            Some("00000000-0000-0000-0000-000000000000"),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "done");
    assert!(
        response
            .cache_control
            .as_deref()
            .is_some_and(|v| v.contains("no-cache"))
    );
}

#[tokio::test]
async fn test_poll_times_out_with_no_message() {
    let app = helpers::TestApp::new();
    let alice = app.login("alice", "a@x").await;

    // Consume the join announcement first.
    app.request("GET", "/api/get?timeout=1", None, Some(&alice)).await;
    let response = app
        .request("GET", "/api/get?timeout=1", None, Some(&alice))
        .await;
    assert_eq!(response.body["data"]["status"], "no_message");
}

#[tokio::test]
async fn test_private_send_reaches_only_target() {
    let app = helpers::TestApp::new();
    let alice = app.login("alice", "a@x").await;
    let bob = app.login("bob", "b@y").await;
    let carol = app.login("carol", "c@z").await;

    let response = app
        .request("POST", "/api/send/bob", Some(json!("psst")), Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    app.request("POST", "/api/send", Some(json!("all")), Some(&alice))
        .await;

    let to_bob = next_annotation(&app, &bob).await;
    assert_eq!(to_bob["kind"], "private");
    assert_eq!(to_bob["payload"], "psst");

    let to_carol = next_annotation(&app, &carol).await;
    assert_eq!(to_carol["payload"], "all");

    let missing = app
        .request("POST", "/api/send/dave", Some(json!("?")), Some(&alice))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_close_ends_session() {
    let app = helpers::TestApp::new();
    let alice = app.login("alice", "a@x").await;

    let response = app.request("DELETE", "/api/close", None, Some(&alice)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.request("GET", "/api/get", None, Some(&alice)).await;
    assert_eq!(response.body["data"]["status"], "done");

    // Closing twice is harmless.
    let response = app.request("DELETE", "/api/close", None, Some(&alice)).await;
    assert_eq!(response.status, StatusCode::OK);

    // The name is free again once the removal is processed.
    tokio::time::sleep(Duration::from_millis(50)).await;
    app.login("alice", "a@x").await;
}

#[tokio::test]
async fn test_date_and_health() {
    let app = helpers::TestApp::new();
    app.login("alice", "a@x").await;

    let date = app.request("GET", "/api/date", None, None).await;
    assert_eq!(date.status, StatusCode::OK);
    assert!(date.body["data"]["epoch_ms"].as_i64().is_some_and(|ms| ms > 0));
    assert!(date.cache_control.is_some());

    let health = app.request("GET", "/api/health", None, None).await;
    assert_eq!(health.body["data"]["status"], "ok");
    assert_eq!(health.body["data"]["broker"], "running");
    assert_eq!(health.body["data"]["subscribers"], 1);
    assert_eq!(health.body["data"]["metrics"]["registrations"], 1);
}

#[tokio::test]
async fn test_login_after_stop_is_unavailable() {
    let app = helpers::TestApp::new();
    app.broker.stop(Duration::from_secs(5)).await.expect("stop");

    let response = app
        .request(
            "POST",
            "/api/login",
            Some(json!({ "name": "alice", "address": "a@x" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}
