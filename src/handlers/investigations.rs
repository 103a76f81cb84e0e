//! # Investigation Endpoint Handlers
//!
//! CRUD, relation, and annotation endpoints for investigations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::OperatorAuth;
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::types::{AnnotationInfo, InvestigationInfo};
use crate::repositories::investigation::{
    InvestigationSort, NewInvestigation, SortOrder,
};
use crate::repositories::{
    AnnotationRepository, InvestigationFilter, InvestigationPatch, InvestigationRepository,
};
use crate::server::AppState;

/// Body for creating an investigation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvestigationRequest {
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "high")]
    pub impact_severity: Option<String>,
    #[schema(example = "p1")]
    pub priority: Option<String>,
    pub component_affected: Option<String>,
    pub service_affected: Option<String>,
    pub detected_at: Option<String>,
    pub started_at: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_by: Option<String>,
    pub assigned_to: Option<String>,
}

/// Body for updating an investigation
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvestigationRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = "resolved")]
    pub status: Option<String>,
    pub impact_severity: Option<String>,
    pub priority: Option<String>,
    pub component_affected: Option<String>,
    pub service_affected: Option<String>,
    pub root_cause: Option<String>,
    pub remediation: Option<String>,
    pub lessons_learned: Option<String>,
    pub detected_at: Option<String>,
    pub started_at: Option<String>,
    pub resolved_at: Option<String>,
    pub tags: Option<Vec<String>>,
    pub assigned_to: Option<String>,
}

/// Query parameters for listing investigations
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListInvestigationsQuery {
    /// Filter by status
    pub status: Option<String>,
    /// Filter by impact severity
    pub severity: Option<String>,
    /// Substring search over title and description
    pub search: Option<String>,
    /// 1-based page number (default: 1)
    pub page: Option<u64>,
    /// Page size (default: 20, max: 100)
    pub page_size: Option<u64>,
    /// Sort key: created_at, updated_at, severity, status
    pub sort_by: Option<String>,
    /// Sort order: asc or desc
    pub sort_order: Option<String>,
}

/// Response payload for the list endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct InvestigationsResponse {
    pub investigations: Vec<InvestigationInfo>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Body for relating two investigations
#[derive(Debug, Deserialize, ToSchema)]
pub struct RelateRequest {
    pub related_id: String,
}

/// Body for adding an annotation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAnnotationRequest {
    pub author: String,
    pub text: String,
    pub parent_annotation_id: Option<String>,
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| validation_error("id must be a valid UUID"))
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| validation_error(&format!("{} must be a valid RFC3339 timestamp", field)))
}

fn parse_enum<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T, ApiError> {
    raw.parse().map_err(|err: String| validation_error(&err))
}

/// Create an investigation
#[utoipa::path(
    post,
    path = "/api/investigations",
    security(("bearer_auth" = [])),
    request_body = CreateInvestigationRequest,
    responses(
        (status = 201, description = "Investigation created", body = InvestigationInfo),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Viewer token on mutating endpoint", body = ApiError)
    ),
    tag = "investigations"
)]
pub async fn create_investigation(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Json(body): Json<CreateInvestigationRequest>,
) -> Result<(StatusCode, Json<InvestigationInfo>), ApiError> {
    let mut new = NewInvestigation {
        title: body.title,
        description: body.description,
        component_affected: body.component_affected,
        service_affected: body.service_affected,
        tags: body.tags.unwrap_or_default(),
        created_by: body.created_by,
        assigned_to: body.assigned_to,
        ..Default::default()
    };

    if let Some(raw) = body.impact_severity.as_deref() {
        new.impact_severity = parse_enum(raw)?;
    }
    if let Some(raw) = body.priority.as_deref() {
        new.priority = parse_enum(raw)?;
    }
    if let Some(raw) = body.detected_at.as_deref() {
        new.detected_at = Some(parse_timestamp("detected_at", raw)?);
    }
    if let Some(raw) = body.started_at.as_deref() {
        new.started_at = Some(parse_timestamp("started_at", raw)?);
    }

    let repo = InvestigationRepository::new(&state.db);
    let investigation = repo.create(new).await?;

    Ok((StatusCode::CREATED, Json(investigation.into())))
}

/// List investigations with filters and pagination
#[utoipa::path(
    get,
    path = "/api/investigations",
    security(("bearer_auth" = [])),
    params(ListInvestigationsQuery),
    responses(
        (status = 200, description = "Investigations listed", body = InvestigationsResponse),
        (status = 400, description = "Invalid query parameters", body = ApiError)
    ),
    tag = "investigations"
)]
pub async fn list_investigations(
    State(state): State<AppState>,
    Query(query): Query<ListInvestigationsQuery>,
) -> Result<Json<InvestigationsResponse>, ApiError> {
    let page = query.page.unwrap_or(1);
    if page < 1 {
        return Err(validation_error("page must be at least 1"));
    }

    let page_size = query.page_size.unwrap_or(20);
    if !(1..=100).contains(&page_size) {
        return Err(validation_error("page_size must be between 1 and 100"));
    }

    let sort_by = match query.sort_by.as_deref() {
        None | Some("created_at") => InvestigationSort::CreatedAt,
        Some("updated_at") => InvestigationSort::UpdatedAt,
        Some("severity") => InvestigationSort::Severity,
        Some("status") => InvestigationSort::Status,
        Some(other) => {
            return Err(validation_error(&format!("unknown sort_by: {}", other)));
        }
    };

    let sort_order = match query.sort_order.as_deref() {
        None | Some("desc") => SortOrder::Desc,
        Some("asc") => SortOrder::Asc,
        Some(other) => {
            return Err(validation_error(&format!("unknown sort_order: {}", other)));
        }
    };

    let filter = InvestigationFilter {
        status: query.status.as_deref().map(parse_enum).transpose()?,
        impact_severity: query.severity.as_deref().map(parse_enum).transpose()?,
        search: query.search,
        page,
        page_size,
        sort_by,
        sort_order,
    };

    let repo = InvestigationRepository::new(&state.db);
    let (rows, total) = repo.list(&filter).await?;

    Ok(Json(InvestigationsResponse {
        investigations: rows.into_iter().map(Into::into).collect(),
        total,
        page,
        page_size,
    }))
}

/// Fetch a single investigation
#[utoipa::path(
    get,
    path = "/api/investigations/{id}",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Investigation found", body = InvestigationInfo),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "investigations"
)]
pub async fn get_investigation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InvestigationInfo>, ApiError> {
    let id = parse_id(&id)?;
    let repo = InvestigationRepository::new(&state.db);

    let investigation = repo
        .get_active(id)
        .await?
        .ok_or_else(|| not_found("investigation not found"))?;

    let related = repo.related_ids(id).await?;

    let mut info: InvestigationInfo = investigation.into();
    info.related_investigation_ids = related.iter().map(Uuid::to_string).collect();

    Ok(Json(info))
}

/// Update an investigation
#[utoipa::path(
    patch,
    path = "/api/investigations/{id}",
    security(("bearer_auth" = [])),
    request_body = UpdateInvestigationRequest,
    responses(
        (status = 200, description = "Investigation updated", body = InvestigationInfo),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "investigations"
)]
pub async fn update_investigation(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Path(id): Path<String>,
    Json(body): Json<UpdateInvestigationRequest>,
) -> Result<Json<InvestigationInfo>, ApiError> {
    let id = parse_id(&id)?;

    let mut patch = InvestigationPatch {
        title: body.title,
        description: body.description,
        component_affected: body.component_affected,
        service_affected: body.service_affected,
        root_cause: body.root_cause,
        remediation: body.remediation,
        lessons_learned: body.lessons_learned,
        tags: body.tags,
        assigned_to: body.assigned_to,
        ..Default::default()
    };

    if let Some(raw) = body.status.as_deref() {
        patch.status = Some(parse_enum(raw)?);
    }
    if let Some(raw) = body.impact_severity.as_deref() {
        patch.impact_severity = Some(parse_enum(raw)?);
    }
    if let Some(raw) = body.priority.as_deref() {
        patch.priority = Some(parse_enum(raw)?);
    }
    if let Some(raw) = body.detected_at.as_deref() {
        patch.detected_at = Some(parse_timestamp("detected_at", raw)?);
    }
    if let Some(raw) = body.started_at.as_deref() {
        patch.started_at = Some(parse_timestamp("started_at", raw)?);
    }
    if let Some(raw) = body.resolved_at.as_deref() {
        patch.resolved_at = Some(parse_timestamp("resolved_at", raw)?);
    }

    let repo = InvestigationRepository::new(&state.db);
    let investigation = repo.update(id, patch).await?;

    Ok(Json(investigation.into()))
}

/// Soft-delete an investigation
#[utoipa::path(
    delete,
    path = "/api/investigations/{id}",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Investigation deleted"),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "investigations"
)]
pub async fn delete_investigation(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let repo = InvestigationRepository::new(&state.db);

    if repo.soft_delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("investigation not found"))
    }
}

/// Relate two investigations
#[utoipa::path(
    post,
    path = "/api/investigations/{id}/related",
    security(("bearer_auth" = [])),
    request_body = RelateRequest,
    responses(
        (status = 200, description = "Relation recorded"),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "investigations"
)]
pub async fn relate_investigation(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Path(id): Path<String>,
    Json(body): Json<RelateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;
    let related_id = parse_id(&body.related_id)?;

    let repo = InvestigationRepository::new(&state.db);
    let created = repo.relate(id, related_id).await?;

    Ok(Json(serde_json::json!({
        "investigation_id": id,
        "related_id": related_id,
        "created": created,
    })))
}

/// Add an annotation to an investigation
#[utoipa::path(
    post,
    path = "/api/investigations/{id}/annotations",
    security(("bearer_auth" = [])),
    request_body = CreateAnnotationRequest,
    responses(
        (status = 201, description = "Annotation created", body = AnnotationInfo),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "annotations"
)]
pub async fn create_annotation(
    State(state): State<AppState>,
    _auth: OperatorAuth,
    Path(id): Path<String>,
    Json(body): Json<CreateAnnotationRequest>,
) -> Result<(StatusCode, Json<AnnotationInfo>), ApiError> {
    let id = parse_id(&id)?;
    let parent_id = body
        .parent_annotation_id
        .as_deref()
        .map(parse_id)
        .transpose()?;

    let repo = AnnotationRepository::new(&state.db);
    let annotation = repo.create(id, &body.author, &body.text, parent_id).await?;

    Ok((StatusCode::CREATED, Json(annotation.into())))
}

/// List annotations of an investigation in thread order
#[utoipa::path(
    get,
    path = "/api/investigations/{id}/annotations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Annotations listed"),
        (status = 404, description = "Investigation not found", body = ApiError)
    ),
    tag = "annotations"
)]
pub async fn list_annotations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;

    let repo = AnnotationRepository::new(&state.db);
    let annotations: Vec<AnnotationInfo> = repo
        .list_for_investigation(id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(serde_json::json!({ "annotations": annotations })))
}
