//! Migration to create the annotations table.
//!
//! Annotations are threaded notes on an investigation; parent_annotation_id
//! points at another annotation of the same investigation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Annotations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Annotations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Annotations::InvestigationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Annotations::Author).text().not_null())
                    .col(ColumnDef::new(Annotations::Body).text().not_null())
                    .col(
                        ColumnDef::new(Annotations::ParentAnnotationId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Annotations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Annotations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_annotations_investigation_id")
                            .from(Annotations::Table, Annotations::InvestigationId)
                            .to(Investigations::Table, Investigations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_annotations_investigation")
                    .table(Annotations::Table)
                    .col(Annotations::InvestigationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_annotations_investigation")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Annotations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Annotations {
    Table,
    Id,
    InvestigationId,
    Author,
    Body,
    ParentAnnotationId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Investigations {
    Table,
    Id,
}
