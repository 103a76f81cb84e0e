//! Investigation relation entity model
//!
//! Join table associating investigations with related investigations.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "investigation_relations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub investigation_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub related_investigation_id: Uuid,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::investigation::Entity",
        from = "Column::InvestigationId",
        to = "super::investigation::Column::Id"
    )]
    Investigation,
}

impl Related<super::investigation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Investigation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
