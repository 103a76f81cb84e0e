//! Event-investigation link entity model
//!
//! Join table for the many-to-many association between events and
//! investigations. linked_at records the first time the pair was linked.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "event_investigation_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub investigation_id: Uuid,

    /// Set on first link, never updated afterwards
    pub linked_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::investigation::Entity",
        from = "Column::InvestigationId",
        to = "super::investigation::Column::Id"
    )]
    Investigation,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::investigation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Investigation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
