//! # Dead-Letter Queue Repository
//!
//! Durable sink for events that failed ingestion after exhausting retries.
//! One row per event id; `put` upserts, `remove` is idempotent. The put and
//! remove paths never raise — a storage failure is reported as `false` and
//! logged, because the callers (connector harness, replay handler) must not
//! crash on DLQ trouble.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::connectors::trait_::NormalizedEvent;
use crate::error::RepositoryError;
use crate::models::dlq_event::{ActiveModel, Column, Entity as DlqEvent, Model};
use crate::models::types::EventSource;
use crate::repositories::to_db_time;

/// Repository for dead-letter entries.
#[derive(Clone)]
pub struct DlqRepository {
    db: DatabaseConnection,
}

impl DlqRepository {
    /// Create a new DlqRepository owning a handle to the shared pool.
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Upsert a failed event by id.
    ///
    /// On insert the row records first_failure_at; on replace it keeps the
    /// original first_failure_at and refreshes last_failure_at. Returns false
    /// only when the storage write itself fails.
    pub async fn put(&self, event: &NormalizedEvent, error: &str, retry_count: u32) -> bool {
        let now = to_db_time(chrono::Utc::now());

        let payload = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(event_id = %event.id, error = %err, "Failed to serialize event for DLQ");
                return false;
            }
        };

        let existing = match DlqEvent::find_by_id(event.id).one(&self.db).await {
            Ok(row) => row,
            Err(err) => {
                tracing::error!(event_id = %event.id, error = %err, "Failed to read DLQ row");
                return false;
            }
        };

        let result = match existing {
            Some(row) => {
                let mut active: ActiveModel = row.into();
                active.event = Set(payload);
                active.error_message = Set(error.to_string());
                active.retry_count = Set(retry_count as i32);
                active.last_failure_at = Set(now);
                active.update(&self.db).await.map(|_| ())
            }
            None => {
                let active = ActiveModel {
                    id: Set(event.id),
                    source: Set(event.source.to_string()),
                    event: Set(payload),
                    error_message: Set(error.to_string()),
                    retry_count: Set(retry_count as i32),
                    first_failure_at: Set(now),
                    last_failure_at: Set(now),
                    created_at: Set(now),
                };
                active.insert(&self.db).await.map(|_| ())
            }
        };

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(event_id = %event.id, error = %err, "Failed to store event in DLQ");
                false
            }
        }
    }

    /// List entries ordered by last failure, newest first.
    pub async fn list(
        &self,
        source: Option<EventSource>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Model>, RepositoryError> {
        let mut query = DlqEvent::find();

        if let Some(source) = source {
            query = query.filter(Column::Source.eq(source.to_string()));
        }

        let entries = query
            .order_by_desc(Column::LastFailureAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(entries)
    }

    /// Fetch a single entry by event id.
    pub async fn get(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        DlqEvent::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Remove an entry (after replay or purge). Idempotent: removing a
    /// missing id succeeds.
    pub async fn remove(&self, id: Uuid) -> bool {
        match DlqEvent::delete_by_id(id).exec(&self.db).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(event_id = %id, error = %err, "Failed to remove event from DLQ");
                false
            }
        }
    }

    /// Number of entries for a source. Errors count as zero; this feeds the
    /// status endpoint, which must not fail because the DLQ is unreadable.
    pub async fn count(&self, source: Option<EventSource>) -> u64 {
        let mut query = DlqEvent::find();

        if let Some(source) = source {
            query = query.filter(Column::Source.eq(source.to_string()));
        }

        match query.count(&self.db).await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!(error = %err, "Failed to count DLQ entries");
                0
            }
        }
    }
}
