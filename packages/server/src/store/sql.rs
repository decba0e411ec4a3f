use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::{NewProject, ProjectStore, StoreError};
use crate::entity::project;

/// [`ProjectStore`] backed by the `project` table.
#[derive(Clone)]
pub struct SqlProjectStore {
    db: DatabaseConnection,
}

impl SqlProjectStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectStore for SqlProjectStore {
    async fn insert(&self, project: NewProject) -> Result<project::Model, StoreError> {
        project.validate()?;

        let model = project::ActiveModel {
            id: Set(Uuid::now_v7()),
            title: Set(project.title.trim().to_string()),
            description: Set(project.description),
            price: Set(project.price),
            file_id: Set(project.file_id),
            created_at: Set(project.created_at.unwrap_or_else(Utc::now)),
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<project::Model>, StoreError> {
        Ok(project::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_file_id(&self, file_id: Uuid) -> Result<Option<project::Model>, StoreError> {
        Ok(project::Entity::find()
            .filter(project::Column::FileId.eq(file_id))
            .one(&self.db)
            .await?)
    }

    async fn list_all(&self) -> Result<Vec<project::Model>, StoreError> {
        Ok(project::Entity::find()
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::Id)
            .all(&self.db)
            .await?)
    }
}
