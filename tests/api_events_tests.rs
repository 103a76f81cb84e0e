//! Integration tests for the event endpoints: manual creation, listing,
//! filtering, and substring search.

mod common;

use axum::http::StatusCode;
use common::{OPERATOR_TOKEN, VIEWER_TOKEN, app, create_manual_event, get, post, test_state};
use serde_json::json;

#[tokio::test]
async fn manual_event_create_and_list() {
    let state = test_state().await;
    let app = app(&state);

    let (status, body) = post(
        &app,
        "/api/events",
        Some(OPERATOR_TOKEN),
        json!({
            "event_type": "deploy_marker",
            "severity": "info",
            "occurred_at": "2026-01-27T10:00:00Z",
            "payload": {"message": "v2.14 rolled out"},
            "tags": ["deploy"],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "manual");
    assert_eq!(body["event_type"], "deploy_marker");
    assert_eq!(body["severity"], "info");

    let (status, body) = get(&app, "/api/events", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn manual_event_duplicate_source_ref_conflicts() {
    let state = test_state().await;
    let app = app(&state);

    let request = json!({
        "event_type": "deploy_marker",
        "source_ref": "deploy-42",
    });

    let (status, _) = post(&app, "/api/events", Some(OPERATOR_TOKEN), request.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post(&app, "/api/events", Some(OPERATOR_TOKEN), request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn event_validation_failures_return_400() {
    let state = test_state().await;
    let app = app(&state);

    let cases = [
        json!({"event_type": ""}),
        json!({"event_type": "note", "severity": "apocalyptic"}),
        json!({"event_type": "note", "occurred_at": "late"}),
    ];

    for body in cases {
        let (status, response) = post(&app, "/api/events", Some(OPERATOR_TOKEN), body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case {} -> {}", body, response);
        assert_eq!(response["error"], "validation");
    }
}

#[tokio::test]
async fn list_filters_by_source_severity_and_time() {
    let state = test_state().await;
    let app = app(&state);

    create_manual_event(&app, "early entry", "2026-01-27T09:00:00Z").await;
    create_manual_event(&app, "late entry", "2026-01-27T11:00:00Z").await;

    let (status, body) = get(
        &app,
        "/api/events?occurred_after=2026-01-27T10:00:00Z",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["payload"]["message"], "late entry");

    let (status, body) = get(&app, "/api/events?source=git", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["events"].as_array().unwrap().is_empty());

    let (status, body) = get(&app, "/api/events?severity=medium", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().unwrap().len(), 2);

    let (status, body) = get(&app, "/api/events?source=carrier-pigeon", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn events_ordered_newest_occurrence_first() {
    let state = test_state().await;
    let app = app(&state);

    create_manual_event(&app, "first", "2026-01-27T09:00:00Z").await;
    create_manual_event(&app, "third", "2026-01-27T11:00:00Z").await;
    create_manual_event(&app, "second", "2026-01-27T10:00:00Z").await;

    let (status, body) = get(&app, "/api/events", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);

    let messages: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["payload"]["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn search_matches_fixed_fields() {
    let state = test_state().await;
    let app = app(&state);

    create_manual_event(&app, "Database connection failed", "2026-01-27T10:00:00Z").await;
    create_manual_event(&app, "UI polish", "2026-01-27T10:05:00Z").await;

    let (status, body) = get(
        &app,
        "/api/events/search?q=database",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["payload"]["message"], "Database connection failed");

    // Empty query is a validation error.
    let (status, body) = get(&app, "/api/events/search?q=%20", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn connectors_status_empty_registry() {
    let state = test_state().await;
    let app = app(&state);

    let (status, body) = get(&app, "/api/connectors/status", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["connectors"].as_array().unwrap().is_empty());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unregistered_connector_paths_are_404() {
    let state = test_state().await;
    let app = app(&state);

    let (status, body) = get(&app, "/api/connectors/logs/dlq", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = get(&app, "/api/connectors/smoke-signals/dlq", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(
        &app,
        "/api/connectors/logs/collect",
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
