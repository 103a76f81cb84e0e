//! End-to-end integration tests: connector collect through the HTTP surface,
//! DLQ replay, and the event linker driven over the API.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{OPERATOR_TOKEN, VIEWER_TOKEN, app, create_investigation, get, post, test_state_with};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use faultline::connectors::{
    CircuitBreaker, CircuitBreakerConfig, ConnectorHarness, ConnectorRegistry, LogFeed,
    LogsConnector, MetricsConnector, MetricsFeed, RetryPolicy, TracesConnector, TracesFeed,
};
use faultline::repositories::DlqRepository;

fn harness(
    connector: Arc<dyn faultline::connectors::Connector>,
    dlq: DlqRepository,
    shutdown: CancellationToken,
) -> Arc<ConnectorHarness> {
    Arc::new(ConnectorHarness::new(
        connector,
        RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        },
        CircuitBreaker::new(CircuitBreakerConfig::default()),
        dlq,
        shutdown,
    ))
}

#[tokio::test]
async fn logs_collect_flows_into_event_store() {
    let state = test_state_with(|db, shutdown| {
        let mut registry = ConnectorRegistry::new();
        let connector = Arc::new(LogsConnector::new(LogFeed::Static(vec![json!({
            "level": "error",
            "message": "Database connection failed",
            "timestamp": "2026-01-27T10:00:00Z",
            "service": "api",
        })])));
        registry.register(harness(connector, DlqRepository::new(db.clone()), shutdown));
        registry
    })
    .await;
    let app = app(&state);

    let (status, body) = post(
        &app,
        "/api/connectors/logs/collect",
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collected"], 1);
    assert_eq!(body["inserted"], 1);

    let (status, body) = get(&app, "/api/events?source=logs", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);

    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);

    let event = &events[0];
    assert_eq!(event["source"], "logs");
    assert_eq!(event["severity"], "high");
    let tags = event["tags"].as_array().unwrap();
    for expected in ["error", "connection_error", "database"] {
        assert!(
            tags.iter().any(|tag| tag == expected),
            "missing tag {} in {:?}",
            expected,
            tags
        );
    }

    // A second collect of the same feed deduplicates on (source, source_ref).
    let (status, body) = post(
        &app,
        "/api/connectors/logs/collect",
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duplicates"], 1);
    assert_eq!(body["inserted"], 0);
}

#[tokio::test]
async fn metrics_and_traces_collect_detect_issues() {
    let state = test_state_with(|db, shutdown| {
        let mut registry = ConnectorRegistry::new();
        let dlq = DlqRepository::new(db.clone());

        let metrics = Arc::new(MetricsConnector::new(MetricsFeed::Static(
            [(
                "cpu_usage".to_string(),
                json!({"value": 95.0, "history": [10, 12, 11, 13, 12]}),
            )]
            .into_iter()
            .collect(),
        )));
        registry.register(harness(metrics, dlq.clone(), shutdown.clone()));

        let traces = Arc::new(TracesConnector::new(TracesFeed::Static(vec![json!({
            "traceID": "trace-9",
            "spans": [{
                "spanID": "span-1",
                "operationName": "db.query",
                "startTime": 0,
                "duration": 6_000_000,
                "tags": [{"key": "error", "value": true}],
                "logs": [{"fields": [{"key": "message", "value": "timeout"}]}],
            }],
            "processes": {"p1": {"serviceName": "checkout"}},
        })])));
        registry.register(harness(traces, dlq, shutdown));

        registry
    })
    .await;
    let app = app(&state);

    let (status, body) = post(
        &app,
        "/api/connectors/metrics/collect",
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inserted"], 1);

    let (status, body) = get(
        &app,
        "/api/events?source=metrics&event_type=metric_anomaly",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let anomaly = &body["events"][0];
    assert!(matches!(
        anomaly["severity"].as_str().unwrap(),
        "high" | "critical"
    ));

    let (status, body) = post(
        &app,
        "/api/connectors/traces/collect",
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inserted"], 2, "slow_trace plus span_error");

    let (status, body) = get(
        &app,
        "/api/events?source=traces&event_type=slow_trace",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"][0]["severity"], "critical");

    let (status, body) = get(
        &app,
        "/api/events?source=traces&event_type=span_error",
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"][0]["severity"], "high");
    assert_eq!(body["events"][0]["payload"]["error_message"], "timeout");
}

#[tokio::test]
async fn rejected_log_lines_land_in_dlq_and_replay() {
    let state = test_state_with(|db, shutdown| {
        let mut registry = ConnectorRegistry::new();
        let connector = Arc::new(LogsConnector::new(LogFeed::Static(vec![
            json!({
                "level": "error",
                "message": "good entry",
                "timestamp": "2026-01-27T10:00:00Z",
            }),
            json!({
                "level": "error",
                "message": "bad entry",
                "timestamp": "not-a-timestamp",
            }),
        ])));
        registry.register(harness(connector, DlqRepository::new(db.clone()), shutdown));
        registry
    })
    .await;
    let app = app(&state);

    let (status, body) = post(
        &app,
        "/api/connectors/logs/collect",
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inserted"], 1, "valid sibling still ingested");

    let (status, body) = get(&app, "/api/connectors/logs/dlq", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);

    let entry = &body["dlq_events"][0];
    let entry_id = entry["id"].as_str().unwrap();
    assert!(entry["error_message"]
        .as_str()
        .unwrap()
        .contains("invalid timestamp"));

    // Status endpoint reflects the DLQ depth.
    let (status, body) = get(&app, "/api/connectors/status", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let connector_status = &body["connectors"][0];
    assert_eq!(connector_status["source"], "logs");
    assert_eq!(connector_status["state"], "closed");
    assert_eq!(connector_status["dlq_size"], 1);

    // Replay moves the entry into the event store and drains the queue.
    let (status, body) = post(
        &app,
        &format!("/api/connectors/logs/dlq/{}/retry", entry_id),
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "replayed");

    let (status, body) = get(&app, "/api/connectors/logs/dlq", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 0);

    // Replaying a drained entry is a 404.
    let (status, _) = post(
        &app,
        &format!("/api/connectors/logs/dlq/{}/retry", entry_id),
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auto_link_and_suggestions_over_http() {
    let state = test_state_with(|_, _| ConnectorRegistry::new()).await;
    let app = app(&state);

    let investigation_id = create_investigation(&app, "Database Connection Timeout").await;

    // One matching event near the investigation, one off-topic, one far away.
    let now = chrono::Utc::now();
    let near = (now - chrono::Duration::minutes(20)).to_rfc3339();
    let off_topic = (now - chrono::Duration::minutes(10)).to_rfc3339();
    let far = (now + chrono::Duration::hours(3)).to_rfc3339();

    common::create_manual_event(&app, "Database connection pool fix", &near).await;
    common::create_manual_event(&app, "UI refactor", &off_topic).await;
    common::create_manual_event(&app, "Database connection dropped", &far).await;

    let (status, body) = post(
        &app,
        &format!(
            "/api/investigations/{}/events/auto-link?time_window_minutes=60&semantic_matching=true",
            investigation_id
        ),
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1, "only the near, on-topic event links: {}", body);

    let (status, body) = get(
        &app,
        &format!("/api/investigations/{}/events", investigation_id),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0]["payload"]["message"],
        "Database connection pool fix"
    );

    // Suggestions exclude the already-linked event; the off-topic one fails
    // the semantic filter and the far one fails the 30-minute window.
    let (status, body) = get(
        &app,
        &format!(
            "/api/investigations/{}/events/suggestions",
            investigation_id
        ),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["suggestions"].as_array().unwrap().is_empty());

    // Auto-link against a missing investigation is a 404 at the HTTP layer.
    let (status, _) = post(
        &app,
        "/api/investigations/00000000-0000-0000-0000-000000000000/events/auto-link",
        Some(OPERATOR_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manual_link_and_soft_delete_cascade() {
    let state = test_state_with(|_, _| ConnectorRegistry::new()).await;
    let app = app(&state);

    let investigation_id = create_investigation(&app, "Linked incident").await;
    let event_id = common::create_manual_event(
        &app,
        "suspicious deploy",
        &chrono::Utc::now().to_rfc3339(),
    )
    .await;

    let (status, body) = post(
        &app,
        &format!("/api/investigations/{}/events/link", investigation_id),
        Some(OPERATOR_TOKEN),
        json!({"event_id": event_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event_id"], event_id);
    assert!(body["linked_at"].is_string());

    let (status, body) = get(
        &app,
        &format!("/api/investigations/{}/events", investigation_id),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().unwrap().len(), 1);

    // Soft-deleting the investigation hides its linked events.
    let (status, _) = common::delete(
        &app,
        &format!("/api/investigations/{}", investigation_id),
        Some(OPERATOR_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(
        &app,
        &format!("/api/investigations/{}/events", investigation_id),
        Some(VIEWER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The event itself is still visible in the global listing.
    let (status, body) = get(&app, "/api/events", Some(VIEWER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
}
