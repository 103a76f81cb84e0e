//! Shared helpers for the HTTP integration suites: an in-memory application
//! instance and a small request/response harness.

// Each integration binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use faultline::config::AppConfig;
use faultline::connectors::ConnectorRegistry;
use faultline::server::{AppState, create_app};
use migration::{Migrator, MigratorTrait};

pub const OPERATOR_TOKEN: &str = "test-operator-token";
pub const VIEWER_TOKEN: &str = "test-viewer-token";

pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        operator_tokens: vec![OPERATOR_TOKEN.to_string()],
        viewer_tokens: vec![VIEWER_TOKEN.to_string()],
        ..Default::default()
    }
}

pub async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("create in-memory db");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

/// Application state over a fresh in-memory database and an empty registry.
pub async fn test_state() -> AppState {
    let db = test_db().await;
    AppState {
        config: Arc::new(test_config()),
        db,
        registry: Arc::new(ConnectorRegistry::new()),
    }
}

/// Application state with a caller-assembled connector registry.
pub async fn test_state_with<F>(build_registry: F) -> AppState
where
    F: FnOnce(&DatabaseConnection, CancellationToken) -> ConnectorRegistry,
{
    let db = test_db().await;
    let registry = build_registry(&db, CancellationToken::new());
    AppState {
        config: Arc::new(test_config()),
        db,
        registry: Arc::new(registry),
    }
}

pub fn app(state: &AppState) -> Router {
    create_app(state.clone())
}

/// Issue one request and decode the JSON body (Null for empty bodies).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request succeeds");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("decode JSON body")
    };

    (status, value)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn patch(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, token, None).await
}

/// Create an investigation through the API and return its id.
pub async fn create_investigation(app: &Router, title: &str) -> String {
    let (status, body) = post(
        app,
        "/api/investigations",
        Some(OPERATOR_TOKEN),
        serde_json::json!({"title": title}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["id"].as_str().expect("id in response").to_string()
}

/// Create a manual event through the API and return its id.
pub async fn create_manual_event(app: &Router, message: &str, occurred_at: &str) -> String {
    let (status, body) = post(
        app,
        "/api/events",
        Some(OPERATOR_TOKEN),
        serde_json::json!({
            "event_type": "note",
            "severity": "medium",
            "occurred_at": occurred_at,
            "payload": {"message": message},
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "event create failed: {}", body);
    body["id"].as_str().expect("id in response").to_string()
}
