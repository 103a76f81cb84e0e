//! Migration to create the investigation_relations join table.
//!
//! Associates investigations with other investigations (related incidents).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InvestigationRelations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvestigationRelations::InvestigationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestigationRelations::RelatedInvestigationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestigationRelations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(InvestigationRelations::InvestigationId)
                            .col(InvestigationRelations::RelatedInvestigationId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_investigation_relations_investigation")
                            .from(
                                InvestigationRelations::Table,
                                InvestigationRelations::InvestigationId,
                            )
                            .to(Investigations::Table, Investigations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_investigation_relations_related")
                            .from(
                                InvestigationRelations::Table,
                                InvestigationRelations::RelatedInvestigationId,
                            )
                            .to(Investigations::Table, Investigations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InvestigationRelations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InvestigationRelations {
    Table,
    InvestigationId,
    RelatedInvestigationId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Investigations {
    Table,
    Id,
}
