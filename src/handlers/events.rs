//! # Event Endpoint Handlers
//!
//! Listing, substring search, and manual creation of events.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use utoipa::{IntoParams, ToSchema};

use crate::auth::OperatorAuth;
use crate::connectors::trait_::NormalizedEvent;
use crate::error::{ApiError, conflict, validation_error};
use crate::handlers::types::EventInfo;
use crate::linker::EventLinker;
use crate::models::types::{EventSeverity, EventSource};
use crate::repositories::{CreateOutcome, EventFilter, EventRepository};
use crate::server::AppState;

/// Query parameters for listing events
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListEventsQuery {
    /// Filter by source (git, ci, logs, metrics, traces, manual)
    pub source: Option<String>,
    /// Filter by severity
    pub severity: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Filter by exact tag membership
    pub tag: Option<String>,
    /// Inclusive lower bound on occurrence time (RFC3339)
    pub occurred_after: Option<String>,
    /// Inclusive upper bound on occurrence time (RFC3339)
    pub occurred_before: Option<String>,
    /// Include soft-deleted events (default: false)
    pub include_deleted: Option<bool>,
    /// Maximum number of events to return (default: 50, max: 200)
    pub limit: Option<u64>,
    /// Offset into the result set (default: 0)
    pub offset: Option<u64>,
}

/// Query parameters for event search
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchEventsQuery {
    /// Search query, matched case-insensitively against message, repo,
    /// branch, author, job, and status fields
    pub q: String,
    /// Filter by source
    pub source: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Maximum number of results (default: 50, max: 200)
    pub limit: Option<usize>,
}

/// Body for manually creating an event
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub event_type: String,
    #[schema(example = "medium")]
    pub severity: Option<String>,
    /// Occurrence timestamp; defaults to now
    pub occurred_at: Option<String>,
    pub payload: Option<JsonValue>,
    pub tags: Option<Vec<String>>,
    pub source_ref: Option<String>,
}

fn parse_source(raw: Option<&str>) -> Result<Option<EventSource>, ApiError> {
    raw.map(|value| {
        value
            .parse::<EventSource>()
            .map_err(|err| validation_error(&err))
    })
    .transpose()
}

fn parse_severity(raw: Option<&str>) -> Result<Option<EventSeverity>, ApiError> {
    raw.map(|value| {
        value
            .parse::<EventSeverity>()
            .map_err(|err| validation_error(&err))
    })
    .transpose()
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| validation_error(&format!("{} must be a valid RFC3339 timestamp", field)))
}

/// List events with filters and pagination
#[utoipa::path(
    get,
    path = "/api/events",
    security(("bearer_auth" = [])),
    params(ListEventsQuery),
    responses(
        (status = 200, description = "Events listed"),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(validation_error("limit must be between 1 and 200"));
    }

    let filter = EventFilter {
        source: parse_source(query.source.as_deref())?,
        severity: parse_severity(query.severity.as_deref())?,
        event_type: query.event_type,
        tag: query.tag,
        start: query
            .occurred_after
            .as_deref()
            .map(|raw| parse_timestamp("occurred_after", raw))
            .transpose()?,
        end: query
            .occurred_before
            .as_deref()
            .map(|raw| parse_timestamp("occurred_before", raw))
            .transpose()?,
        include_deleted: query.include_deleted.unwrap_or(false),
        limit: Some(limit),
        offset: query.offset,
    };

    let repo = EventRepository::new(&state.db);
    let events: Vec<EventInfo> = repo
        .list(&filter)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(serde_json::json!({ "events": events })))
}

/// Substring search across events
#[utoipa::path(
    get,
    path = "/api/events/search",
    security(("bearer_auth" = [])),
    params(SearchEventsQuery),
    responses(
        (status = 200, description = "Search results"),
        (status = 400, description = "Invalid query parameters", body = ApiError)
    ),
    tag = "events"
)]
pub async fn search_events(
    State(state): State<AppState>,
    Query(query): Query<SearchEventsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if query.q.trim().is_empty() {
        return Err(validation_error("q must not be empty"));
    }

    let limit = query.limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(validation_error("limit must be between 1 and 200"));
    }

    let source = parse_source(query.source.as_deref())?;

    let linker = EventLinker::new(&state.db);
    let results: Vec<EventInfo> = linker
        .search(&query.q, source, query.event_type, limit)
        .await
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(serde_json::json!({
        "query": query.q,
        "results": results,
    })))
}

/// Manually create an event (source=manual)
#[utoipa::path(
    post,
    path = "/api/events",
    security(("bearer_auth" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventInfo),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Duplicate (source, source_ref) pair", body = ApiError)
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventInfo>), ApiError> {
    if body.event_type.trim().is_empty() {
        return Err(validation_error("event_type must not be empty"));
    }

    let severity = parse_severity(body.severity.as_deref())?.unwrap_or(EventSeverity::Medium);
    let occurred_at = body
        .occurred_at
        .as_deref()
        .map(|raw| parse_timestamp("occurred_at", raw))
        .transpose()?
        .unwrap_or_else(Utc::now);

    let mut event = NormalizedEvent::new(
        EventSource::Manual,
        body.event_type,
        severity,
        occurred_at,
    );
    if let Some(payload) = body.payload {
        event = event.with_payload(payload);
    }
    if let Some(tags) = body.tags {
        event = event.with_tags(tags);
    }
    if let Some(source_ref) = body.source_ref {
        event = event.with_source_ref(source_ref);
    }

    let repo = EventRepository::new(&state.db);
    match repo.create(&event).await? {
        CreateOutcome::Created => {
            let stored = repo
                .get(event.id)
                .await?
                .ok_or_else(|| crate::error::internal("event vanished after insert"))?;
            Ok((StatusCode::CREATED, Json(stored.into())))
        }
        CreateOutcome::AlreadyExists => Err(conflict(
            "an event with this source_ref already exists for the manual source",
        )),
    }
}
