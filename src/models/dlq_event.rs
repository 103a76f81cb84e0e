//! Dead-letter entry entity model
//!
//! One row per failed event id; re-entry during an active retry cycle
//! updates the existing row instead of inserting a second one.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dlq_events")]
pub struct Model {
    /// Id of the failed event (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Connector source the event came from
    pub source: String,

    /// Serialized original event
    #[sea_orm(column_type = "JsonBinary")]
    pub event: JsonValue,

    pub error_message: String,

    pub retry_count: i32,

    /// Recorded on first insertion, preserved across replaces
    pub first_failure_at: DateTimeWithTimeZone,

    /// Updated on every replace
    pub last_failure_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
