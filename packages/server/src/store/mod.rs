//! Project metadata persistence.

mod sql;

pub use sql::SqlProjectStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::project;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record is missing a required field.
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Fields supplied when creating a project record.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub file_id: Uuid,
    /// Defaults to the insert time.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewProject {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation("Title is required".into()));
        }
        if self.price.is_some_and(|p| !p.is_finite()) {
            return Err(StoreError::Validation("Price must be a finite number".into()));
        }
        Ok(())
    }
}

/// Record store for project metadata.
///
/// Records are insert-only.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Assign an id (and `created_at` if unset) and persist the record.
    async fn insert(&self, project: NewProject) -> Result<project::Model, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<project::Model>, StoreError>;

    async fn find_by_file_id(&self, file_id: Uuid) -> Result<Option<project::Model>, StoreError>;

    /// All records, newest first.
    async fn list_all(&self) -> Result<Vec<project::Model>, StoreError>;
}
