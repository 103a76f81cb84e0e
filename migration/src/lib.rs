//! Database migrations for the Faultline RCA workspace.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_06_01_000100_create_investigations;
mod m2026_06_01_000200_create_events;
mod m2026_06_01_000300_create_event_investigation_links;
mod m2026_06_01_000400_create_investigation_relations;
mod m2026_06_01_000500_create_annotations;
mod m2026_06_01_000600_create_dlq_events;
mod m2026_06_01_000700_create_revoked_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_06_01_000100_create_investigations::Migration),
            Box::new(m2026_06_01_000200_create_events::Migration),
            Box::new(m2026_06_01_000300_create_event_investigation_links::Migration),
            Box::new(m2026_06_01_000400_create_investigation_relations::Migration),
            Box::new(m2026_06_01_000500_create_annotations::Migration),
            Box::new(m2026_06_01_000600_create_dlq_events::Migration),
            Box::new(m2026_06_01_000700_create_revoked_tokens::Migration),
        ]
    }
}
