//! Migration to create the investigations table.
//!
//! Investigations are incident records under active or historical analysis,
//! carrying lifecycle timestamps, ownership, and free-text RCA fields.

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
                    .table(Investigations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Investigations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Investigations::Title).text().not_null())
                    .col(ColumnDef::new(Investigations::Description).text().null())
                    .col(
                        ColumnDef::new(Investigations::Status)
                            .text()
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(Investigations::ImpactSeverity)
                            .text()
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Investigations::Priority)
                            .text()
                            .not_null()
                            .default("p2"),
                    )
                    .col(
                        ColumnDef::new(Investigations::ComponentAffected)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Investigations::ServiceAffected)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(Investigations::RootCause).text().null())
                    .col(ColumnDef::new(Investigations::Remediation).text().null())
                    .col(
                        ColumnDef::new(Investigations::LessonsLearned)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Investigations::DetectedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Investigations::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Investigations::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Investigations::Tags).json_binary().null())
                    .col(ColumnDef::new(Investigations::CreatedBy).text().null())
                    .col(ColumnDef::new(Investigations::AssignedTo).text().null())
                    .col(
                        ColumnDef::new(Investigations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Investigations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Investigations::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_investigations_status")
                    .table(Investigations::Table)
                    .col(Investigations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_investigations_impact_severity")
                    .table(Investigations::Table)
                    .col(Investigations::ImpactSeverity)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_investigations_priority")
                    .table(Investigations::Table)
                    .col(Investigations::Priority)
                    .to_owned(),
            )
            .await?;

        // Created-at DESC ordering dominates list queries; raw SQL keeps the
        // DESC modifier portable across sqlite and postgres.
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_investigations_created_at ON investigations (created_at DESC)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_investigations_status").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_investigations_impact_severity")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_investigations_priority").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_investigations_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Investigations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Investigations {
    Table,
    Id,
    Title,
    Description,
    Status,
    ImpactSeverity,
    Priority,
    ComponentAffected,
    ServiceAffected,
    RootCause,
    Remediation,
    LessonsLearned,
    DetectedAt,
    StartedAt,
    ResolvedAt,
    Tags,
    CreatedBy,
    AssignedTo,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
