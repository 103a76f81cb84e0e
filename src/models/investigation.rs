//! Investigation entity model
//!
//! An investigation is an incident record under root-cause analysis, with
//! lifecycle timestamps, ownership, and bounded free-text RCA fields.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "investigations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Incident summary
    pub title: String,

    /// Detailed incident description
    pub description: Option<String>,

    /// Lifecycle status (open, in_progress, resolved, closed)
    pub status: String,

    /// Business impact (critical, high, medium, low)
    pub impact_severity: String,

    /// Priority (p0..p3)
    pub priority: String,

    pub component_affected: Option<String>,

    pub service_affected: Option<String>,

    /// Identified root cause
    pub root_cause: Option<String>,

    /// Remediation plan
    pub remediation: Option<String>,

    /// Lessons learned write-up
    pub lessons_learned: Option<String>,

    pub detected_at: Option<DateTimeWithTimeZone>,

    pub started_at: Option<DateTimeWithTimeZone>,

    pub resolved_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub tags: Option<JsonValue>,

    pub created_by: Option<String>,

    pub assigned_to: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Soft-delete marker; hiding cascades to annotations and event links
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_link::Entity")]
    EventLink,
    #[sea_orm(has_many = "super::annotation::Entity")]
    Annotation,
}

impl Related<super::event_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventLink.def()
    }
}

impl Related<super::annotation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Annotation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Tag list decoded from the JSON column.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .and_then(|value| value.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
