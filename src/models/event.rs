//! Event entity model
//!
//! This module contains the SeaORM entity model for the events table,
//! which stores normalized signals emitted by connectors.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Event entity representing a normalized signal from one source
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    /// Unique identifier for the event (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Origin of the signal (git, ci, logs, metrics, traces, manual)
    pub source: String,

    /// Normalized event kind (e.g., commit, ci_run, metric_anomaly)
    pub event_type: String,

    /// Severity level (critical, high, medium, low, info)
    pub severity: String,

    /// Timestamp when the event occurred in the source system
    pub occurred_at: DateTimeWithTimeZone,

    /// Timestamp when the event was ingested
    pub ingested_at: DateTimeWithTimeZone,

    /// Source-specific payload
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: JsonValue,

    /// Searchable tags
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub tags: Option<JsonValue>,

    /// Foreign identifier in the source system (commit hash, build id, span id);
    /// unique per (source, source_ref) when present
    pub source_ref: Option<String>,

    /// Soft-delete marker; null while the event is visible
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_link::Entity")]
    EventLink,
}

impl Related<super::event_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventLink.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
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
