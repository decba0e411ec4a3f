use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::project;

/// Response DTO for a single project.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    /// Project ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    #[schema(example = "Calculator")]
    pub title: String,
    #[schema(example = "A simple calculator")]
    pub description: String,
    /// `null` when the submitted price was blank or not numeric.
    #[schema(example = 9.99)]
    pub price: Option<f64>,
    /// Blob ID of the archive; use it with `/download/{id}`.
    #[schema(example = "01936f0e-1234-7abc-8000-0000000000ff")]
    pub file_id: String,
    pub created_at: DateTime<Utc>,
}

/// Response body of a successful upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    #[schema(example = "File uploaded and saved")]
    pub message: String,
    pub project: ProjectResponse,
}

impl From<project::Model> for ProjectResponse {
    fn from(model: project::Model) -> Self {
        Self {
            id: model.id.to_string(),
            title: model.title,
            description: model.description,
            price: model.price,
            file_id: model.file_id.to_string(),
            created_at: model.created_at,
        }
    }
}
