//! Migration to create the events table.
//!
//! Events are normalized signals emitted by connectors (git, ci, logs,
//! metrics, traces) or created manually, queryable by source, severity,
//! and occurrence time.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Events::Source).text().not_null())
                    .col(ColumnDef::new(Events::EventType).text().not_null())
                    .col(ColumnDef::new(Events::Severity).text().not_null())
                    .col(
                        ColumnDef::new(Events::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Events::IngestedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Events::Payload).json_binary().not_null())
                    .col(ColumnDef::new(Events::Tags).json_binary().null())
                    .col(ColumnDef::new(Events::SourceRef).text().null())
                    .col(
                        ColumnDef::new(Events::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Occurrence-descending ordering backs every list query; raw SQL keeps
        // the DESC modifier portable across sqlite and postgres.
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_events_occurred ON events (occurred_at DESC)"
                    .to_string(),
            ))
            .await?;

        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_events_source_occurred ON events (source, occurred_at DESC)".to_string(),
            ))
            .await?;

        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_events_severity_occurred ON events (severity, occurred_at DESC)".to_string(),
            ))
            .await?;

        // (source, source_ref) is unique only when a foreign identifier was
        // supplied; a partial unique index expresses that on both backends.
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_events_source_ref ON events (source, source_ref) WHERE source_ref IS NOT NULL".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_events_occurred").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_events_source_occurred").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_events_severity_occurred")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_events_source_ref").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Source,
    EventType,
    Severity,
    OccurredAt,
    IngestedAt,
    Payload,
    Tags,
    SourceRef,
    DeletedAt,
}
