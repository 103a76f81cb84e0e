//! # Connector Endpoint Handlers
//!
//! Per-connector health, operator-triggered ingestion, DLQ inspection, and
//! DLQ replay.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::OperatorAuth;
use crate::connectors::CircuitState;
use crate::connectors::trait_::NormalizedEvent;
use crate::error::{ApiError, internal, not_found, validation_error};
use crate::handlers::investigations::parse_id;
use crate::handlers::types::{DlqEntryInfo, now_rfc3339};
use crate::models::types::EventSource;
use crate::repositories::{CreateOutcome, EventRepository};
use crate::scheduler::ingest_once;
use crate::server::AppState;

/// Health snapshot for one connector
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectorStatusInfo {
    #[schema(example = "logs")]
    pub source: String,
    pub state: CircuitState,
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<String>,
    pub dlq_size: u64,
}

/// Response payload for the status endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectorsStatusResponse {
    pub connectors: Vec<ConnectorStatusInfo>,
    pub timestamp: String,
}

/// Query parameters for listing DLQ entries
#[derive(Debug, Deserialize, IntoParams)]
pub struct DlqQuery {
    /// Maximum number of entries to return (default: 50, max: 200)
    pub limit: Option<u64>,
    /// Offset into the result set (default: 0)
    pub offset: Option<u64>,
}

fn parse_source(raw: &str) -> Result<EventSource, ApiError> {
    raw.parse::<EventSource>()
        .map_err(|_| not_found(&format!("connector not found: {}", raw)))
}

/// Health status of all registered connectors
#[utoipa::path(
    get,
    path = "/api/connectors/status",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Connector statuses", body = ConnectorsStatusResponse)
    ),
    tag = "connectors"
)]
pub async fn connectors_status(
    State(state): State<AppState>,
) -> Result<Json<ConnectorsStatusResponse>, ApiError> {
    let mut connectors = Vec::new();

    for harness in state.registry.iter() {
        let snapshot = harness.circuit_snapshot();
        let dlq_size = harness.dlq().count(Some(harness.source())).await;

        connectors.push(ConnectorStatusInfo {
            source: harness.source().to_string(),
            state: snapshot.state,
            failure_count: snapshot.failure_count,
            last_failure: snapshot.last_failure_at.map(|dt| dt.to_rfc3339()),
            last_success: snapshot.last_success_at.map(|dt| dt.to_rfc3339()),
            dlq_size,
        });
    }

    Ok(Json(ConnectorsStatusResponse {
        connectors,
        timestamp: now_rfc3339(),
    }))
}

/// Trigger a collect-and-ingest pass for one connector
#[utoipa::path(
    post,
    path = "/api/connectors/{source}/collect",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ingest pass completed"),
        (status = 404, description = "Connector not found", body = ApiError)
    ),
    tag = "connectors"
)]
pub async fn trigger_collect(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Path(source): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let source = parse_source(&source)?;
    let harness = state
        .registry
        .get(source)
        .map_err(|err| not_found(&err.to_string()))?;

    let timeout = Duration::from_secs(state.config.scheduler.collect_timeout_seconds);
    let stats = ingest_once(&state.db, &harness, timeout).await;

    Ok(Json(serde_json::json!({
        "source": source,
        "collected": stats.collected,
        "inserted": stats.inserted,
        "duplicates": stats.duplicates,
        "storage_failures": stats.storage_failures,
        "timestamp": now_rfc3339(),
    })))
}

/// Dead-letter queue contents for one connector
#[utoipa::path(
    get,
    path = "/api/connectors/{source}/dlq",
    security(("bearer_auth" = [])),
    params(DlqQuery),
    responses(
        (status = 200, description = "DLQ entries listed"),
        (status = 404, description = "Connector not found", body = ApiError)
    ),
    tag = "connectors"
)]
pub async fn dlq_list(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(query): Query<DlqQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let source = parse_source(&source)?;
    let harness = state
        .registry
        .get(source)
        .map_err(|err| not_found(&err.to_string()))?;

    let limit = query.limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(validation_error("limit must be between 1 and 200"));
    }
    let offset = query.offset.unwrap_or(0);

    let entries: Vec<DlqEntryInfo> = harness
        .dlq()
        .list(Some(source), limit, offset)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total_count = harness.dlq().count(Some(source)).await;

    Ok(Json(serde_json::json!({
        "source": source,
        "dlq_events": entries,
        "total_count": total_count,
        "limit": limit,
        "offset": offset,
    })))
}

/// Replay one DLQ entry into the event store
#[utoipa::path(
    post,
    path = "/api/connectors/{source}/dlq/{id}/retry",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Replay completed"),
        (status = 404, description = "Connector or entry not found", body = ApiError)
    ),
    tag = "connectors"
)]
pub async fn dlq_retry(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Path((source, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let source = parse_source(&source)?;
    let harness = state
        .registry
        .get(source)
        .map_err(|err| not_found(&err.to_string()))?;
    let event_id = parse_id(&id)?;

    let entry = harness
        .dlq()
        .get(event_id)
        .await?
        .ok_or_else(|| not_found(&format!("event not found in DLQ: {}", event_id)))?;

    let event: NormalizedEvent = serde_json::from_value(entry.event)
        .map_err(|err| internal(&format!("stored DLQ event is unreadable: {}", err)))?;

    let repo = EventRepository::new(&state.db);
    let outcome = repo.create(&event).await?;

    // The event is in the store either way; the parked row has served its
    // purpose.
    if !harness.dlq().remove(event_id).await {
        return Err(internal("failed to remove replayed DLQ entry"));
    }

    let status = match outcome {
        CreateOutcome::Created => "replayed",
        CreateOutcome::AlreadyExists => "already_present",
    };

    Ok(Json(serde_json::json!({
        "source": source,
        "event_id": event_id,
        "status": status,
        "timestamp": now_rfc3339(),
    })))
}
