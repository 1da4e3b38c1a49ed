//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use annohub_api::{AppState, build_router};
use annohub_core::config::{AppConfig, BrokerConfig, PersistenceConfig};
use annohub_realtime::{Broker, Delivery, IdentityHandle, Message};

/// Broker configuration with expiry disabled and short polls.
pub fn test_broker_config() -> BrokerConfig {
    BrokerConfig {
        poll_timeout_seconds: 1,
        max_poll_timeout_seconds: 2,
        idle_timeout_seconds: 0,
        ..BrokerConfig::default()
    }
}

/// Start a broker with no durable log.
pub fn start_broker() -> Broker {
    start_broker_with(test_broker_config(), PersistenceConfig::default())
}

/// Start a broker with explicit settings.
pub fn start_broker_with(config: BrokerConfig, persistence: PersistenceConfig) -> Broker {
    let broker = Broker::new(config, &persistence);
    broker.start().expect("Failed to start broker");
    broker
}

/// Collect every message currently reachable, stopping at the first empty wait.
pub async fn drain(broker: &Broker, handle: &IdentityHandle) -> Vec<std::sync::Arc<Message>> {
    let mut out = Vec::new();
    while let Delivery::Message(m) = broker.next(handle, Duration::from_millis(150)).await {
        out.push(m);
    }
    out
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The broker behind the router
    pub broker: Broker,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.broker = test_broker_config();
        let broker = start_broker_with(config.broker.clone(), config.persistence.clone());
        let router = build_router(AppState::new(config, broker.clone()));
        Self { router, broker }
    }

    /// Login and return the session id
    pub async fn login(&self, name: &str, address: &str) -> String {
        let response = self
            .request(
                "POST",
                "/api/login",
                Some(serde_json::json!({ "name": name, "address": address })),
                None,
            )
            .await;

        assert_eq!(
            response.status,
            StatusCode::OK,
            "Login failed: {:?}",
            response.body
        );

        response.body["data"]["session_id"]
            .as_str()
            .expect("No session_id in login response")
            .to_string()
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        session: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(session) = session {
            req = req.header("x-session-id", session);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let cache_control = response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            cache_control,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
    /// `Cache-Control` header, if any
    pub cache_control: Option<String>,
}
