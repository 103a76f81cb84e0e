//! # Event Repository
//!
//! Persistent, queryable store of normalized events. Owns the events table
//! and the event-investigation link table. Conflicts on (source, source_ref)
//! are absorbed: `create` reports AlreadyExists without mutating the existing
//! row.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::connectors::trait_::NormalizedEvent;
use crate::error::{RepositoryError, is_unique_violation};
use crate::models::event::{ActiveModel, Column, Entity as Event, Model};
use crate::models::event_link::{
    ActiveModel as LinkActiveModel, Column as LinkColumn, Entity as EventLink,
};
use crate::models::investigation::{Column as InvestigationColumn, Entity as Investigation};
use crate::models::types::{EventSeverity, EventSource};
use crate::repositories::to_db_time;

/// Result of `create`: a conflict on (source, source_ref) is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Composite filter accepted by `list`; any subset of fields may be set.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub source: Option<EventSource>,
    pub severity: Option<EventSeverity>,
    pub event_type: Option<String>,
    pub tag: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub include_deleted: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Fields an `update` patch may change.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub severity: Option<EventSeverity>,
    pub tags: Option<Vec<String>>,
    pub payload: Option<JsonValue>,
}

/// Repository for event rows and their investigation links.
pub struct EventRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> EventRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist a normalized event. Returns AlreadyExists when another row
    /// with the same (source, source_ref) pair is present; the existing row
    /// is left untouched.
    pub async fn create(&self, event: &NormalizedEvent) -> Result<CreateOutcome, RepositoryError> {
        if let Some(source_ref) = &event.source_ref {
            let existing = Event::find()
                .filter(Column::Source.eq(event.source.to_string()))
                .filter(Column::SourceRef.eq(source_ref.clone()))
                .one(self.db)
                .await
                .map_err(RepositoryError::database_error)?;

            if existing.is_some() {
                return Ok(CreateOutcome::AlreadyExists);
            }
        }

        let active = ActiveModel {
            id: Set(event.id),
            source: Set(event.source.to_string()),
            event_type: Set(event.event_type.clone()),
            severity: Set(event.severity.to_string()),
            occurred_at: Set(to_db_time(event.occurred_at)),
            ingested_at: Set(to_db_time(Utc::now())),
            payload: Set(event.payload.clone()),
            tags: Set(Some(JsonValue::from(event.tags.clone()))),
            source_ref: Set(event.source_ref.clone()),
            deleted_at: Set(None),
        };

        match active.insert(self.db).await {
            Ok(_) => Ok(CreateOutcome::Created),
            // Backstop for the race between the pre-check and the insert.
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::AlreadyExists),
            Err(err) => Err(RepositoryError::Database(err)),
        }
    }

    /// Fetch a single event by id, including soft-deleted rows.
    pub async fn get(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Event::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Patch an event. Returns false when the id does not exist.
    pub async fn update(&self, id: Uuid, patch: EventPatch) -> Result<bool, RepositoryError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(false);
        };

        let mut active: ActiveModel = existing.into();
        if let Some(severity) = patch.severity {
            active.severity = Set(severity.to_string());
        }
        if let Some(tags) = patch.tags {
            active.tags = Set(Some(JsonValue::from(tags)));
        }
        if let Some(payload) = patch.payload {
            active.payload = Set(payload);
        }

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(true)
    }

    /// Mark an event as deleted; it disappears from default queries.
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(false);
        };

        let mut active: ActiveModel = existing.into();
        active.deleted_at = Set(Some(to_db_time(Utc::now())));
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(true)
    }

    /// Clear the delete marker.
    pub async fn restore(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(false);
        };

        let mut active: ActiveModel = existing.into();
        active.deleted_at = Set(None);
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(true)
    }

    /// Link an event to an investigation. Idempotent: linking an existing
    /// pair succeeds without touching linked_at. Returns true when a new
    /// link row was created.
    pub async fn link_to_investigation(
        &self,
        event_id: Uuid,
        investigation_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        if self.get(event_id).await?.is_none() {
            return Err(RepositoryError::NotFound(format!(
                "event {} not found",
                event_id
            )));
        }

        let investigation = Investigation::find_by_id(investigation_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if investigation.is_none() {
            return Err(RepositoryError::NotFound(format!(
                "investigation {} not found",
                investigation_id
            )));
        }

        let existing = EventLink::find_by_id((event_id, investigation_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if existing.is_some() {
            return Ok(false);
        }

        let link = LinkActiveModel {
            event_id: Set(event_id),
            investigation_id: Set(investigation_id),
            linked_at: Set(to_db_time(Utc::now())),
        };

        match link.insert(self.db).await {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(RepositoryError::Database(err)),
        }
    }

    /// List events with the composite filter, ordered most-recent occurrence
    /// first, ties broken by ingest timestamp then id.
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<Model>, RepositoryError> {
        let mut query = Event::find();

        if !filter.include_deleted {
            query = query.filter(Column::DeletedAt.is_null());
        }

        if let Some(source) = filter.source {
            query = query.filter(Column::Source.eq(source.to_string()));
        }

        if let Some(severity) = filter.severity {
            query = query.filter(Column::Severity.eq(severity.to_string()));
        }

        if let Some(event_type) = &filter.event_type {
            query = query.filter(Column::EventType.eq(event_type.clone()));
        }

        if let Some(start) = filter.start {
            query = query.filter(Column::OccurredAt.gte(to_db_time(start)));
        }

        if let Some(end) = filter.end {
            query = query.filter(Column::OccurredAt.lte(to_db_time(end)));
        }

        query = query
            .order_by_desc(Column::OccurredAt)
            .order_by_desc(Column::IngestedAt)
            .order_by_asc(Column::Id);

        // Tag membership requires decoding the JSON column, so pagination is
        // applied after the in-memory tag filter.
        if filter.tag.is_none() {
            if let Some(offset) = filter.offset {
                query = query.offset(offset);
            }
            if let Some(limit) = filter.limit {
                query = query.limit(limit);
            }
        }

        let mut events = query
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if let Some(tag) = &filter.tag {
            events.retain(|event| event.tag_list().iter().any(|candidate| candidate == tag));

            let offset = filter.offset.unwrap_or(0) as usize;
            if offset > 0 {
                events = events.into_iter().skip(offset).collect();
            }
            if let Some(limit) = filter.limit {
                events.truncate(limit as usize);
            }
        }

        Ok(events)
    }

    /// Events linked to an investigation, newest occurrence first. Errors
    /// with NotFound when the investigation is missing or soft-deleted, so
    /// hidden investigations cascade-hide their event links.
    pub async fn by_investigation(
        &self,
        investigation_id: Uuid,
        source: Option<EventSource>,
        event_type: Option<String>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Model>, RepositoryError> {
        let investigation = Investigation::find_by_id(investigation_id)
            .filter(InvestigationColumn::DeletedAt.is_null())
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if investigation.is_none() {
            return Err(RepositoryError::NotFound(format!(
                "investigation {} not found",
                investigation_id
            )));
        }

        let event_ids = self.linked_event_ids(investigation_id).await?;
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = Event::find()
            .filter(Column::Id.is_in(event_ids))
            .filter(Column::DeletedAt.is_null());

        if let Some(source) = source {
            query = query.filter(Column::Source.eq(source.to_string()));
        }

        if let Some(event_type) = event_type {
            query = query.filter(Column::EventType.eq(event_type));
        }

        query = query
            .order_by_desc(Column::OccurredAt)
            .order_by_desc(Column::IngestedAt)
            .order_by_asc(Column::Id);

        if let Some(offset) = offset {
            query = query.offset(offset);
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Ids of all events linked to an investigation, regardless of event
    /// visibility.
    pub async fn linked_event_ids(
        &self,
        investigation_id: Uuid,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        let links = EventLink::find()
            .filter(LinkColumn::InvestigationId.eq(investigation_id))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(links.into_iter().map(|link| link.event_id).collect())
    }

    /// The link row for a pair, if present.
    pub async fn get_link(
        &self,
        event_id: Uuid,
        investigation_id: Uuid,
    ) -> Result<Option<crate::models::event_link::Model>, RepositoryError> {
        EventLink::find_by_id((event_id, investigation_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Events within an inclusive occurrence-time window, visible only.
    pub async fn in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Model>, RepositoryError> {
        self.list(&EventFilter {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        })
        .await
    }
}
