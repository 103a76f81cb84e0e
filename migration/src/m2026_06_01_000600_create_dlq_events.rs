//! Migration to create the dlq_events table.
//!
//! The dead-letter queue stores events that failed ingestion after all
//! retries. One row per event id; replays upsert the existing row.

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
                    .table(DlqEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DlqEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DlqEvents::Source).text().not_null())
                    .col(ColumnDef::new(DlqEvents::Event).json_binary().not_null())
                    .col(ColumnDef::new(DlqEvents::ErrorMessage).text().not_null())
                    .col(
                        ColumnDef::new(DlqEvents::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DlqEvents::FirstFailureAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DlqEvents::LastFailureAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DlqEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_dlq_events_source_last_failure ON dlq_events (source, last_failure_at DESC)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_dlq_events_source_last_failure")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DlqEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DlqEvents {
    Table,
    Id,
    Source,
    Event,
    ErrorMessage,
    RetryCount,
    FirstFailureAt,
    LastFailureAt,
    CreatedAt,
}
