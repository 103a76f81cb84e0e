//! # Annotation Repository
//!
//! Threaded notes on investigations. A parent annotation must belong to the
//! same investigation, and annotations of a soft-deleted investigation are
//! hidden along with it.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::annotation::{ActiveModel, Column, Entity as Annotation, Model};
use crate::models::investigation::{Column as InvestigationColumn, Entity as Investigation};
use crate::repositories::investigation::MAX_TEXT_LEN;
use crate::repositories::to_db_time;

/// Repository for annotation rows.
pub struct AnnotationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> AnnotationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Add an annotation to a visible investigation.
    pub async fn create(
        &self,
        investigation_id: Uuid,
        author: &str,
        body: &str,
        parent_annotation_id: Option<Uuid>,
    ) -> Result<Model, RepositoryError> {
        if author.trim().is_empty() {
            return Err(RepositoryError::Validation(
                "author must not be empty".to_string(),
            ));
        }
        if body.trim().is_empty() {
            return Err(RepositoryError::Validation(
                "annotation text must not be empty".to_string(),
            ));
        }
        if body.chars().count() > MAX_TEXT_LEN {
            return Err(RepositoryError::Validation(format!(
                "annotation text exceeds {} characters",
                MAX_TEXT_LEN
            )));
        }

        self.require_visible_investigation(investigation_id).await?;

        if let Some(parent_id) = parent_annotation_id {
            let parent = Annotation::find_by_id(parent_id)
                .one(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .ok_or_else(|| {
                    RepositoryError::NotFound(format!("parent annotation {} not found", parent_id))
                })?;

            if parent.investigation_id != investigation_id {
                return Err(RepositoryError::Validation(
                    "parent annotation belongs to a different investigation".to_string(),
                ));
            }
        }

        let now = to_db_time(Utc::now());
        let active = ActiveModel {
            id: Set(Uuid::new_v4()),
            investigation_id: Set(investigation_id),
            author: Set(author.to_string()),
            body: Set(body.to_string()),
            parent_annotation_id: Set(parent_annotation_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        active
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Annotations of a visible investigation, oldest first (thread order).
    pub async fn list_for_investigation(
        &self,
        investigation_id: Uuid,
    ) -> Result<Vec<Model>, RepositoryError> {
        self.require_visible_investigation(investigation_id).await?;

        Annotation::find()
            .filter(Column::InvestigationId.eq(investigation_id))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn require_visible_investigation(
        &self,
        investigation_id: Uuid,
    ) -> Result<(), RepositoryError> {
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

        Ok(())
    }
}
