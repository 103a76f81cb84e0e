//! Migration to create the event_investigation_links join table.
//!
//! Records the many-to-many association between events and investigations.
//! linked_at is set when the association is first created and never updated.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventInvestigationLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventInvestigationLinks::EventId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventInvestigationLinks::InvestigationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventInvestigationLinks::LinkedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(EventInvestigationLinks::EventId)
                            .col(EventInvestigationLinks::InvestigationId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_links_event_id")
                            .from(
                                EventInvestigationLinks::Table,
                                EventInvestigationLinks::EventId,
                            )
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_links_investigation_id")
                            .from(
                                EventInvestigationLinks::Table,
                                EventInvestigationLinks::InvestigationId,
                            )
                            .to(Investigations::Table, Investigations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_links_investigation")
                    .table(EventInvestigationLinks::Table)
                    .col(EventInvestigationLinks::InvestigationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_event_links_investigation")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(EventInvestigationLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EventInvestigationLinks {
    Table,
    EventId,
    InvestigationId,
    LinkedAt,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Investigations {
    Table,
    Id,
}
