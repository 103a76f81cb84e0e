//! Integration tests for the investigation endpoints: auth, CRUD, lifecycle
//! invariants, annotations, and relations.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    OPERATOR_TOKEN, VIEWER_TOKEN, app, create_investigation, delete, get, patch, post, send,
    test_state,
};
use serde_json::json;

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let state = test_state().await;
    let app = app(&state);

    let (status, body) = get(&app, "/api/investigations", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let state = test_state().await;
    let app = app(&state);

    let (status, _) = get(&app, "/api/investigations", Some("bogus")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewer_token_reads_but_cannot_mutate() {
    let state = test_state().await;
    let app = app(&state);

    let (status, _) = get(&app, "/api/investigations", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/api/investigations",
        Some(VIEWER_TOKEN),
        json!({"title": "Nope"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn root_is_public() {
    let state = test_state().await;
    let app = app(&state);

    let (status, body) = get(&app, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "faultline");
}

#[tokio::test]
async fn create_and_fetch_investigation() {
    let state = test_state().await;
    let app = app(&state);

    let (status, body) = post(
        &app,
        "/api/investigations",
        Some(OPERATOR_TOKEN),
        json!({
            "title": "Checkout latency spike",
            "description": "p99 jumped to 4s",
            "impact_severity": "high",
            "priority": "p1",
            "service_affected": "checkout",
            "tags": ["latency"],
            "created_by": "ana",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "open");
    assert_eq!(body["impact_severity"], "high");
    assert_eq!(body["priority"], "p1");

    let id = body["id"].as_str().unwrap();
    let (status, fetched) = get(
        &app,
        &format!("/api/investigations/{}", id),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Checkout latency spike");
    assert_eq!(fetched["tags"], json!(["latency"]));
}

#[tokio::test]
async fn create_validation_failures_return_400() {
    let state = test_state().await;
    let app = app(&state);

    let cases = [
        json!({"title": ""}),
        json!({"title": "ok", "impact_severity": "catastrophic"}),
        json!({"title": "ok", "priority": "p9"}),
        json!({"title": "ok", "detected_at": "yesterday"}),
        json!({"title": "ok", "description": "x".repeat(2001)}),
    ];

    for body in cases {
        let (status, response) =
            post(&app, "/api/investigations", Some(OPERATOR_TOKEN), body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case {} -> {}", body, response);
        assert_eq!(response["error"], "validation");
    }
}

#[tokio::test]
async fn missing_investigation_returns_404_envelope() {
    let state = test_state().await;
    let app = app(&state);

    let (status, body) = get(
        &app,
        "/api/investigations/00000000-0000-0000-0000-000000000000",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = get(&app, "/api/investigations/not-a-uuid", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn update_moves_status_forward_only() {
    let state = test_state().await;
    let app = app(&state);
    let id = create_investigation(&app, "Incident").await;

    let (status, body) = patch(
        &app,
        &format!("/api/investigations/{}", id),
        Some(OPERATOR_TOKEN),
        json!({"status": "resolved", "root_cause": "connection pool too small"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "resolved");
    assert!(body["resolved_at"].is_string());

    let (status, body) = patch(
        &app,
        &format!("/api/investigations/{}", id),
        Some(OPERATOR_TOKEN),
        json!({"status": "open"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn delete_soft_deletes_and_hides() {
    let state = test_state().await;
    let app = app(&state);
    let id = create_investigation(&app, "Short-lived").await;

    let (status, _) = delete(
        &app,
        &format!("/api/investigations/{}", id),
        Some(OPERATOR_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(
        &app,
        &format!("/api/investigations/{}", id),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting again is a 404; the row is already hidden.
    let (status, _) = delete(
        &app,
        &format!("/api/investigations/{}", id),
        Some(OPERATOR_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_supports_filters_sort_and_paging() {
    let state = test_state().await;
    let app = app(&state);

    for (title, severity) in [
        ("Database outage", "critical"),
        ("Slow deploys", "medium"),
        ("Broken images", "low"),
    ] {
        let (status, _) = post(
            &app,
            "/api/investigations",
            Some(OPERATOR_TOKEN),
            json!({"title": title, "impact_severity": severity}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get(
        &app,
        "/api/investigations?severity=critical",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["investigations"][0]["title"], "Database outage");

    let (status, body) = get(
        &app,
        "/api/investigations?search=deploys",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = get(
        &app,
        "/api/investigations?page=2&page_size=2&sort_by=created_at&sort_order=asc",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["investigations"].as_array().unwrap().len(), 1);

    let (status, body) = get(&app, "/api/investigations?sort_by=height", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn annotations_thread_and_cascade_hide() {
    let state = test_state().await;
    let app = app(&state);
    let id = create_investigation(&app, "Annotated incident").await;

    let (status, root) = post(
        &app,
        &format!("/api/investigations/{}/annotations", id),
        Some(OPERATOR_TOKEN),
        json!({"author": "ana", "text": "First observation"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, reply) = post(
        &app,
        &format!("/api/investigations/{}/annotations", id),
        Some(OPERATOR_TOKEN),
        json!({
            "author": "ben",
            "text": "Replying",
            "parent_annotation_id": root["id"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["parent_annotation_id"], root["id"]);

    let (status, body) = get(
        &app,
        &format!("/api/investigations/{}/annotations", id),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["annotations"].as_array().unwrap().len(), 2);

    // Parent from a different investigation is rejected.
    let other = create_investigation(&app, "Other incident").await;
    let (status, body) = post(
        &app,
        &format!("/api/investigations/{}/annotations", other),
        Some(OPERATOR_TOKEN),
        json!({
            "author": "cai",
            "text": "Cross-thread reply",
            "parent_annotation_id": root["id"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    // Soft-deleting the investigation hides its annotations.
    let (status, _) = delete(
        &app,
        &format!("/api/investigations/{}", id),
        Some(OPERATOR_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(
        &app,
        &format!("/api/investigations/{}/annotations", id),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn related_investigations_round_trip() {
    let state = test_state().await;
    let app = app(&state);

    let a = create_investigation(&app, "Primary").await;
    let b = create_investigation(&app, "Secondary").await;

    let (status, body) = post(
        &app,
        &format!("/api/investigations/{}/related", a),
        Some(OPERATOR_TOKEN),
        json!({"related_id": b}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], true);

    let (status, fetched) = get(
        &app,
        &format!("/api/investigations/{}", b),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["related_investigation_ids"], json!([a]));
}

#[tokio::test]
async fn revoked_token_stops_working() {
    let state = test_state().await;
    let app = app(&state);

    let (status, _) = get(&app, "/api/investigations", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/api/auth/revoke",
        Some(OPERATOR_TOKEN),
        json!({"token": VIEWER_TOKEN}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], true);

    let (status, body) = get(&app, "/api/investigations", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let state = test_state().await;
    let app = app(&state);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/investigations",
        Some(OPERATOR_TOKEN),
        Some(json!({"title": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
