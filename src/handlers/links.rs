//! # Event Linking Endpoint Handlers
//!
//! Manual linking, auto-linking, linked-event listing, and suggestions for
//! an investigation.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::OperatorAuth;
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::investigations::parse_id;
use crate::handlers::types::EventInfo;
use crate::linker::{DEFAULT_TIME_WINDOW_MINUTES, EventLinker};
use crate::models::types::EventSource;
use crate::repositories::{EventRepository, InvestigationRepository};
use crate::server::AppState;

/// Body for manually linking an event
#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkEventRequest {
    pub event_id: String,
}

/// Query parameters for auto-linking
#[derive(Debug, Deserialize, IntoParams)]
pub struct AutoLinkQuery {
    /// Half-window in minutes around the investigation's creation instant
    /// (default: 60)
    pub time_window_minutes: Option<i64>,
    /// Whether keyword matching against the title is applied (default: true)
    pub semantic_matching: Option<bool>,
}

/// A link created by the auto-linker
#[derive(Debug, Serialize, ToSchema)]
pub struct LinkInfo {
    pub event_id: String,
    pub investigation_id: String,
    pub linked_at: String,
}

/// Response payload for auto-link
#[derive(Debug, Serialize, ToSchema)]
pub struct AutoLinkResponse {
    pub links: Vec<LinkInfo>,
    pub count: usize,
}

/// Query parameters for listing linked events
#[derive(Debug, Deserialize, IntoParams)]
pub struct LinkedEventsQuery {
    /// Filter by source
    pub source: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Maximum number of events to return (default: 50, max: 200)
    pub limit: Option<u64>,
    /// Offset into the result set (default: 0)
    pub offset: Option<u64>,
}

/// Query parameters for suggestions
#[derive(Debug, Deserialize, IntoParams)]
pub struct SuggestionsQuery {
    /// Maximum number of suggestions (default: 10, max: 50)
    pub limit: Option<usize>,
}

/// Manually link an event to an investigation
#[utoipa::path(
    post,
    path = "/api/investigations/{id}/events/link",
    security(("bearer_auth" = [])),
    request_body = LinkEventRequest,
    responses(
        (status = 200, description = "Link recorded", body = LinkInfo),
        (status = 404, description = "Event or investigation not found", body = ApiError)
    ),
    tag = "linking"
)]
pub async fn link_event(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Path(id): Path<String>,
    Json(body): Json<LinkEventRequest>,
) -> Result<Json<LinkInfo>, ApiError> {
    let investigation_id = parse_id(&id)?;
    let event_id = parse_id(&body.event_id)?;

    let repo = EventRepository::new(&state.db);
    repo.link_to_investigation(event_id, investigation_id)
        .await?;

    let link = repo
        .get_link(event_id, investigation_id)
        .await?
        .ok_or_else(|| not_found("link not found after creation"))?;

    Ok(Json(LinkInfo {
        event_id: link.event_id.to_string(),
        investigation_id: link.investigation_id.to_string(),
        linked_at: link.linked_at.to_rfc3339(),
    }))
}

/// Invoke the event linker for an investigation
#[utoipa::path(
    post,
    path = "/api/investigations/{id}/events/auto-link",
    security(("bearer_auth" = [])),
    params(AutoLinkQuery),
    responses(
        (status = 200, description = "Auto-link completed", body = AutoLinkResponse),
        (status = 400, description = "Invalid parameters", body = ApiError),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "linking"
)]
pub async fn auto_link(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Path(id): Path<String>,
    Query(query): Query<AutoLinkQuery>,
) -> Result<Json<AutoLinkResponse>, ApiError> {
    let investigation_id = parse_id(&id)?;

    let window = query
        .time_window_minutes
        .unwrap_or(DEFAULT_TIME_WINDOW_MINUTES);
    if !(1..=7 * 24 * 60).contains(&window) {
        return Err(validation_error(
            "time_window_minutes must be between 1 and 10080",
        ));
    }
    let semantic = query.semantic_matching.unwrap_or(true);

    // The linker swallows a missing investigation; the HTTP surface must 404.
    InvestigationRepository::new(&state.db)
        .get_active(investigation_id)
        .await?
        .ok_or_else(|| not_found("investigation not found"))?;

    let linker = EventLinker::new(&state.db);
    let links = linker.auto_link(investigation_id, window, semantic).await;

    let links: Vec<LinkInfo> = links
        .into_iter()
        .map(|link| LinkInfo {
            event_id: link.event_id.to_string(),
            investigation_id: link.investigation_id.to_string(),
            linked_at: link.linked_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(AutoLinkResponse {
        count: links.len(),
        links,
    }))
}

/// List events linked to an investigation
#[utoipa::path(
    get,
    path = "/api/investigations/{id}/events",
    security(("bearer_auth" = [])),
    params(LinkedEventsQuery),
    responses(
        (status = 200, description = "Linked events listed"),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "linking"
)]
pub async fn linked_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LinkedEventsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let investigation_id = parse_id(&id)?;

    let limit = query.limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(validation_error("limit must be between 1 and 200"));
    }

    let source = query
        .source
        .as_deref()
        .map(|raw| {
            raw.parse::<EventSource>()
                .map_err(|err| validation_error(&err))
        })
        .transpose()?;

    let repo = EventRepository::new(&state.db);
    let events: Vec<EventInfo> = repo
        .by_investigation(
            investigation_id,
            source,
            query.event_type,
            Some(limit),
            query.offset,
        )
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(serde_json::json!({
        "investigation_id": investigation_id,
        "events": events,
    })))
}

/// Suggest relevant events without linking them
#[utoipa::path(
    get,
    path = "/api/investigations/{id}/events/suggestions",
    security(("bearer_auth" = [])),
    params(SuggestionsQuery),
    responses(
        (status = 200, description = "Suggestions listed"),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "linking"
)]
pub async fn suggestions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SuggestionsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let investigation_id = parse_id(&id)?;

    let limit = query.limit.unwrap_or(10);
    if !(1..=50).contains(&limit) {
        return Err(validation_error("limit must be between 1 and 50"));
    }

    InvestigationRepository::new(&state.db)
        .get_active(investigation_id)
        .await?
        .ok_or_else(|| not_found("investigation not found"))?;

    let linker = EventLinker::new(&state.db);
    let suggestions: Vec<EventInfo> = linker
        .suggest(investigation_id, limit)
        .await
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(serde_json::json!({
        "investigation_id": investigation_id,
        "suggestions": suggestions,
    })))
}
