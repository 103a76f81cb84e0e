//! Shared API response shapes and model-to-wire conversions.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::models::annotation::Model as AnnotationModel;
use crate::models::dlq_event::Model as DlqModel;
use crate::models::event::Model as EventModel;
use crate::models::investigation::Model as InvestigationModel;

/// Event representation for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct EventInfo {
    /// Unique identifier for the event
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Origin of the signal
    #[schema(example = "logs")]
    pub source: String,
    /// Normalized event kind
    #[schema(example = "log_entry")]
    pub event_type: String,
    /// Severity level
    #[schema(example = "high")]
    pub severity: String,
    /// When the event occurred in the source system
    #[schema(example = "2026-01-27T10:00:00Z")]
    pub occurred_at: String,
    /// When the event was ingested
    pub ingested_at: String,
    /// Source-specific payload
    pub payload: JsonValue,
    /// Searchable tags
    pub tags: Vec<String>,
    /// Foreign identifier in the source system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl From<EventModel> for EventInfo {
    fn from(model: EventModel) -> Self {
        let tags = model.tag_list();
        Self {
            id: model.id.to_string(),
            source: model.source,
            event_type: model.event_type,
            severity: model.severity,
            occurred_at: model.occurred_at.to_rfc3339(),
            ingested_at: model.ingested_at.to_rfc3339(),
            payload: model.payload,
            tags,
            source_ref: model.source_ref,
            deleted_at: model.deleted_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Investigation representation for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct InvestigationInfo {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[schema(example = "open")]
    pub status: String,
    #[schema(example = "medium")]
    pub impact_severity: String,
    #[schema(example = "p2")]
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_affected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_affected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lessons_learned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Related investigation ids; populated on detail fetches
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related_investigation_ids: Vec<String>,
}

impl From<InvestigationModel> for InvestigationInfo {
    fn from(model: InvestigationModel) -> Self {
        let tags = model.tag_list();
        Self {
            id: model.id.to_string(),
            title: model.title,
            description: model.description,
            status: model.status,
            impact_severity: model.impact_severity,
            priority: model.priority,
            component_affected: model.component_affected,
            service_affected: model.service_affected,
            root_cause: model.root_cause,
            remediation: model.remediation,
            lessons_learned: model.lessons_learned,
            detected_at: model.detected_at.map(|dt| dt.to_rfc3339()),
            started_at: model.started_at.map(|dt| dt.to_rfc3339()),
            resolved_at: model.resolved_at.map(|dt| dt.to_rfc3339()),
            tags,
            created_by: model.created_by,
            assigned_to: model.assigned_to,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
            related_investigation_ids: Vec::new(),
        }
    }
}

/// Annotation representation for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct AnnotationInfo {
    pub id: String,
    pub investigation_id: String,
    pub author: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_annotation_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AnnotationModel> for AnnotationInfo {
    fn from(model: AnnotationModel) -> Self {
        Self {
            id: model.id.to_string(),
            investigation_id: model.investigation_id.to_string(),
            author: model.author,
            text: model.body,
            parent_annotation_id: model.parent_annotation_id.map(|id| id.to_string()),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Dead-letter entry representation for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct DlqEntryInfo {
    pub id: String,
    pub source: String,
    pub event: JsonValue,
    pub error_message: String,
    pub retry_count: i32,
    pub first_failure_at: String,
    pub last_failure_at: String,
}

impl From<DlqModel> for DlqEntryInfo {
    fn from(model: DlqModel) -> Self {
        Self {
            id: model.id.to_string(),
            source: model.source,
            event: model.event,
            error_message: model.error_message,
            retry_count: model.retry_count,
            first_failure_at: model.first_failure_at.to_rfc3339(),
            last_failure_at: model.last_failure_at.to_rfc3339(),
        }
    }
}

/// Current server time in RFC 3339, attached to status responses.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
