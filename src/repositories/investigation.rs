//! # Investigation Repository
//!
//! CRUD and queries for investigation rows, the related-investigation join
//! table, and the lifecycle invariants: bounded free-text fields, monotonic
//! status transitions, and soft-delete hiding.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::models::investigation::{ActiveModel, Column, Entity as Investigation, Model};
use crate::models::investigation_relation::{
    ActiveModel as RelationActiveModel, Column as RelationColumn, Entity as InvestigationRelation,
};
use crate::models::types::{ImpactSeverity, InvestigationStatus, Priority};
use crate::repositories::to_db_time;

/// Upper bound for the free-text RCA fields.
pub const MAX_TEXT_LEN: usize = 2000;
/// Upper bound for titles.
pub const MAX_TITLE_LEN: usize = 200;

/// Fields accepted when creating an investigation.
#[derive(Debug, Clone)]
pub struct NewInvestigation {
    pub title: String,
    pub description: Option<String>,
    pub impact_severity: ImpactSeverity,
    pub priority: Priority,
    pub component_affected: Option<String>,
    pub service_affected: Option<String>,
    pub detected_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_by: Option<String>,
    pub assigned_to: Option<String>,
}

impl Default for NewInvestigation {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            impact_severity: ImpactSeverity::Medium,
            priority: Priority::P2,
            component_affected: None,
            service_affected: None,
            detected_at: None,
            started_at: None,
            tags: Vec::new(),
            created_by: None,
            assigned_to: None,
        }
    }
}

/// Partial update; unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct InvestigationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<InvestigationStatus>,
    pub impact_severity: Option<ImpactSeverity>,
    pub priority: Option<Priority>,
    pub component_affected: Option<String>,
    pub service_affected: Option<String>,
    pub root_cause: Option<String>,
    pub remediation: Option<String>,
    pub lessons_learned: Option<String>,
    pub detected_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub assigned_to: Option<String>,
}

/// Sort keys accepted by the list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestigationSort {
    CreatedAt,
    UpdatedAt,
    Severity,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filters and pagination for the list query.
#[derive(Debug, Clone)]
pub struct InvestigationFilter {
    pub status: Option<InvestigationStatus>,
    pub impact_severity: Option<ImpactSeverity>,
    pub search: Option<String>,
    pub page: u64,
    pub page_size: u64,
    pub sort_by: InvestigationSort,
    pub sort_order: SortOrder,
}

impl Default for InvestigationFilter {
    fn default() -> Self {
        Self {
            status: None,
            impact_severity: None,
            search: None,
            page: 1,
            page_size: 20,
            sort_by: InvestigationSort::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Repository for investigation rows.
pub struct InvestigationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> InvestigationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create an investigation, enforcing the bounded-text invariants.
    pub async fn create(&self, new: NewInvestigation) -> Result<Model, RepositoryError> {
        validate_title(&new.title)?;
        validate_bounded("description", new.description.as_deref())?;

        let now = to_db_time(Utc::now());
        let active = ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(new.title),
            description: Set(new.description),
            status: Set(InvestigationStatus::Open.to_string()),
            impact_severity: Set(new.impact_severity.to_string()),
            priority: Set(new.priority.to_string()),
            component_affected: Set(new.component_affected),
            service_affected: Set(new.service_affected),
            root_cause: Set(None),
            remediation: Set(None),
            lessons_learned: Set(None),
            detected_at: Set(new.detected_at.map(to_db_time)),
            started_at: Set(new.started_at.map(to_db_time)),
            resolved_at: Set(None),
            tags: Set(Some(JsonValue::from(new.tags))),
            created_by: Set(new.created_by),
            assigned_to: Set(new.assigned_to),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        active
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Fetch by id, including soft-deleted rows.
    pub async fn get(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Investigation::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Fetch by id, excluding soft-deleted rows.
    pub async fn get_active(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Investigation::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Apply a patch. Bounded-text fields are enforced on every mutation and
    /// status transitions must move toward closed.
    pub async fn update(
        &self,
        id: Uuid,
        patch: InvestigationPatch,
    ) -> Result<Model, RepositoryError> {
        let Some(existing) = self.get_active(id).await? else {
            return Err(RepositoryError::NotFound(format!(
                "investigation {} not found",
                id
            )));
        };

        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        validate_bounded("description", patch.description.as_deref())?;
        validate_bounded("root_cause", patch.root_cause.as_deref())?;
        validate_bounded("remediation", patch.remediation.as_deref())?;
        validate_bounded("lessons_learned", patch.lessons_learned.as_deref())?;

        let current_status: InvestigationStatus = existing
            .status
            .parse()
            .map_err(RepositoryError::Validation)?;

        if let Some(next_status) = patch.status {
            if !current_status.can_transition_to(next_status) {
                return Err(RepositoryError::Validation(format!(
                    "invalid status transition: {} -> {}",
                    current_status, next_status
                )));
            }
        }

        let mut active: ActiveModel = existing.into();

        if let Some(title) = patch.title {
            active.title = Set(title);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(status) = patch.status {
            active.status = Set(status.to_string());
            // Reaching resolved stamps resolved_at unless the caller
            // supplied one explicitly.
            if status.rank() >= InvestigationStatus::Resolved.rank()
                && current_status.rank() < InvestigationStatus::Resolved.rank()
                && patch.resolved_at.is_none()
            {
                active.resolved_at = Set(Some(to_db_time(Utc::now())));
            }
        }
        if let Some(impact_severity) = patch.impact_severity {
            active.impact_severity = Set(impact_severity.to_string());
        }
        if let Some(priority) = patch.priority {
            active.priority = Set(priority.to_string());
        }
        if let Some(component) = patch.component_affected {
            active.component_affected = Set(Some(component));
        }
        if let Some(service) = patch.service_affected {
            active.service_affected = Set(Some(service));
        }
        if let Some(root_cause) = patch.root_cause {
            active.root_cause = Set(Some(root_cause));
        }
        if let Some(remediation) = patch.remediation {
            active.remediation = Set(Some(remediation));
        }
        if let Some(lessons) = patch.lessons_learned {
            active.lessons_learned = Set(Some(lessons));
        }
        if let Some(detected_at) = patch.detected_at {
            active.detected_at = Set(Some(to_db_time(detected_at)));
        }
        if let Some(started_at) = patch.started_at {
            active.started_at = Set(Some(to_db_time(started_at)));
        }
        if let Some(resolved_at) = patch.resolved_at {
            active.resolved_at = Set(Some(to_db_time(resolved_at)));
        }
        if let Some(tags) = patch.tags {
            active.tags = Set(Some(JsonValue::from(tags)));
        }
        if let Some(assigned_to) = patch.assigned_to {
            active.assigned_to = Set(Some(assigned_to));
        }
        active.updated_at = Set(to_db_time(Utc::now()));

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Soft delete. Annotations and event links are cascade-hidden by the
    /// queries that read them.
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let Some(existing) = self.get_active(id).await? else {
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

    /// Paged list with filters and sorting. Returns (rows, total count).
    pub async fn list(
        &self,
        filter: &InvestigationFilter,
    ) -> Result<(Vec<Model>, u64), RepositoryError> {
        let mut query = Investigation::find().filter(Column::DeletedAt.is_null());

        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status.to_string()));
        }

        if let Some(severity) = filter.impact_severity {
            query = query.filter(Column::ImpactSeverity.eq(severity.to_string()));
        }

        if let Some(search) = &filter.search {
            query = query.filter(
                Condition::any()
                    .add(Column::Title.contains(search.clone()))
                    .add(Column::Description.contains(search.clone())),
            );
        }

        let total = query
            .clone()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let column = match filter.sort_by {
            InvestigationSort::CreatedAt => Column::CreatedAt,
            InvestigationSort::UpdatedAt => Column::UpdatedAt,
            InvestigationSort::Severity => Column::ImpactSeverity,
            InvestigationSort::Status => Column::Status,
        };

        query = match filter.sort_order {
            SortOrder::Asc => query.order_by_asc(column),
            SortOrder::Desc => query.order_by_desc(column),
        };

        let page = filter.page.max(1);
        let rows = query
            .offset((page - 1) * filter.page_size)
            .limit(filter.page_size)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((rows, total))
    }

    /// Relate two investigations. Idempotent; both rows must exist and be
    /// visible.
    pub async fn relate(&self, id: Uuid, related_id: Uuid) -> Result<bool, RepositoryError> {
        if id == related_id {
            return Err(RepositoryError::Validation(
                "an investigation cannot be related to itself".to_string(),
            ));
        }

        for candidate in [id, related_id] {
            if self.get_active(candidate).await?.is_none() {
                return Err(RepositoryError::NotFound(format!(
                    "investigation {} not found",
                    candidate
                )));
            }
        }

        let existing = InvestigationRelation::find_by_id((id, related_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if existing.is_some() {
            return Ok(false);
        }

        let relation = RelationActiveModel {
            investigation_id: Set(id),
            related_investigation_id: Set(related_id),
            created_at: Set(to_db_time(Utc::now())),
        };

        match relation.insert(self.db).await {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(RepositoryError::Database(err)),
        }
    }

    /// Related investigation ids, looking at both directions of the join.
    pub async fn related_ids(&self, id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        let relations = InvestigationRelation::find()
            .filter(
                Condition::any()
                    .add(RelationColumn::InvestigationId.eq(id))
                    .add(RelationColumn::RelatedInvestigationId.eq(id)),
            )
            .order_by_asc(RelationColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(relations
            .into_iter()
            .map(|relation| {
                if relation.investigation_id == id {
                    relation.related_investigation_id
                } else {
                    relation.investigation_id
                }
            })
            .collect())
    }
}

fn validate_title(title: &str) -> Result<(), RepositoryError> {
    if title.trim().is_empty() {
        return Err(RepositoryError::Validation(
            "title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(RepositoryError::Validation(format!(
            "title exceeds {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

fn validate_bounded(field: &str, value: Option<&str>) -> Result<(), RepositoryError> {
    if let Some(value) = value {
        if value.chars().count() > MAX_TEXT_LEN {
            return Err(RepositoryError::Validation(format!(
                "{} exceeds {} characters",
                field, MAX_TEXT_LEN
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::test_db;

    async fn create_titled(db: &DatabaseConnection, title: &str) -> Model {
        InvestigationRepository::new(db)
            .create(NewInvestigation {
                title: title.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let db = test_db().await;
        let investigation = create_titled(&db, "Checkout latency spike").await;

        assert_eq!(investigation.status, "open");
        assert_eq!(investigation.impact_severity, "medium");
        assert_eq!(investigation.priority, "p2");
        assert!(investigation.deleted_at.is_none());
        assert!(investigation.resolved_at.is_none());
    }

    #[tokio::test]
    async fn bounded_text_enforced_on_create_and_update() {
        let db = test_db().await;
        let repo = InvestigationRepository::new(&db);

        let long_text = "x".repeat(MAX_TEXT_LEN + 1);

        let result = repo
            .create(NewInvestigation {
                title: "Valid".to_string(),
                description: Some(long_text.clone()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));

        let investigation = create_titled(&db, "Valid").await;
        let result = repo
            .update(
                investigation.id,
                InvestigationPatch {
                    root_cause: Some(long_text),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));

        // Exactly at the bound passes.
        let at_limit = "x".repeat(MAX_TEXT_LEN);
        assert!(repo
            .update(
                investigation.id,
                InvestigationPatch {
                    root_cause: Some(at_limit),
                    ..Default::default()
                },
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn empty_title_rejected() {
        let db = test_db().await;
        let repo = InvestigationRepository::new(&db);

        let result = repo
            .create(NewInvestigation {
                title: "   ".to_string(),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }

    #[tokio::test]
    async fn status_transitions_monotonic_toward_closed() {
        let db = test_db().await;
        let repo = InvestigationRepository::new(&db);
        let investigation = create_titled(&db, "Incident").await;

        let updated = repo
            .update(
                investigation.id,
                InvestigationPatch {
                    status: Some(InvestigationStatus::Resolved),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, "resolved");
        assert!(updated.resolved_at.is_some(), "resolved_at auto-stamped");

        let updated = repo
            .update(
                investigation.id,
                InvestigationPatch {
                    status: Some(InvestigationStatus::Closed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, "closed");

        // No un-closing.
        let result = repo
            .update(
                investigation.id,
                InvestigationPatch {
                    status: Some(InvestigationStatus::Open),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));
    }

    #[tokio::test]
    async fn update_missing_or_deleted_is_not_found() {
        let db = test_db().await;
        let repo = InvestigationRepository::new(&db);

        let result = repo.update(Uuid::new_v4(), InvestigationPatch::default()).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));

        let investigation = create_titled(&db, "Short-lived").await;
        assert!(repo.soft_delete(investigation.id).await.unwrap());

        let result = repo
            .update(investigation.id, InvestigationPatch::default())
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn soft_delete_hides_from_list_and_restore_reveals() {
        let db = test_db().await;
        let repo = InvestigationRepository::new(&db);
        let investigation = create_titled(&db, "Hidden soon").await;

        assert!(repo.soft_delete(investigation.id).await.unwrap());

        let (rows, total) = repo.list(&InvestigationFilter::default()).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 0);
        assert!(repo.get_active(investigation.id).await.unwrap().is_none());
        assert!(repo.get(investigation.id).await.unwrap().is_some());

        assert!(repo.restore(investigation.id).await.unwrap());
        let (rows, _) = repo.list(&InvestigationFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn list_filters_and_search() {
        let db = test_db().await;
        let repo = InvestigationRepository::new(&db);

        let db_outage = repo
            .create(NewInvestigation {
                title: "Database outage".to_string(),
                impact_severity: ImpactSeverity::Critical,
                ..Default::default()
            })
            .await
            .unwrap();

        let ui_glitch = repo
            .create(NewInvestigation {
                title: "UI glitch".to_string(),
                description: Some("button misaligned".to_string()),
                impact_severity: ImpactSeverity::Low,
                ..Default::default()
            })
            .await
            .unwrap();

        repo.update(
            ui_glitch.id,
            InvestigationPatch {
                status: Some(InvestigationStatus::Resolved),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let (rows, total) = repo
            .list(&InvestigationFilter {
                status: Some(InvestigationStatus::Open),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, db_outage.id);

        let (rows, _) = repo
            .list(&InvestigationFilter {
                impact_severity: Some(ImpactSeverity::Low),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows[0].id, ui_glitch.id);

        let (rows, _) = repo
            .list(&InvestigationFilter {
                search: Some("misaligned".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, ui_glitch.id);
    }

    #[tokio::test]
    async fn list_pagination_and_sorting() {
        let db = test_db().await;
        let repo = InvestigationRepository::new(&db);

        for index in 0..5 {
            create_titled(&db, &format!("Incident {}", index)).await;
        }

        let (page_one, total) = repo
            .list(&InvestigationFilter {
                page: 1,
                page_size: 2,
                sort_by: InvestigationSort::CreatedAt,
                sort_order: SortOrder::Asc,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page_one.len(), 2);
        assert_eq!(page_one[0].title, "Incident 0");

        let (page_three, _) = repo
            .list(&InvestigationFilter {
                page: 3,
                page_size: 2,
                sort_by: InvestigationSort::CreatedAt,
                sort_order: SortOrder::Asc,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page_three.len(), 1);
        assert_eq!(page_three[0].title, "Incident 4");
    }

    #[tokio::test]
    async fn relate_is_idempotent_and_bidirectional() {
        let db = test_db().await;
        let repo = InvestigationRepository::new(&db);

        let a = create_titled(&db, "Primary").await;
        let b = create_titled(&db, "Secondary").await;

        assert!(repo.relate(a.id, b.id).await.unwrap());
        assert!(!repo.relate(a.id, b.id).await.unwrap());

        assert_eq!(repo.related_ids(a.id).await.unwrap(), vec![b.id]);
        assert_eq!(repo.related_ids(b.id).await.unwrap(), vec![a.id]);

        assert!(matches!(
            repo.relate(a.id, a.id).await,
            Err(RepositoryError::Validation(_))
        ));
        assert!(matches!(
            repo.relate(a.id, Uuid::new_v4()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
