//! Annotation entity model
//!
//! Threaded notes on an investigation. parent_annotation_id, when set, must
//! reference an annotation of the same investigation (enforced by the
//! repository).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "annotations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub investigation_id: Uuid,

    pub author: String,

    pub body: String,

    /// Parent annotation for threaded replies
    pub parent_annotation_id: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
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
