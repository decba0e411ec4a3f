use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::models::project::ProjectResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    operation_id = "listProjects",
    summary = "List all projects",
    description = "Returns every project record, newest first. No pagination.",
    responses(
        (status = 200, description = "Projects ordered by creation time, descending", body = Vec<ProjectResponse>),
        (status = 500, description = "Store failure (LIST_FAILED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    let projects = state
        .projects
        .list_all()
        .await
        .map_err(|e| AppError::ListFailed(e.to_string()))?;

    Ok(Json(
        projects.into_iter().map(ProjectResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Projects",
    operation_id = "getProject",
    summary = "Get a project by ID",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project record", body = ProjectResponse),
        (status = 400, description = "Malformed ID (MALFORMED_ID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project_id = Uuid::parse_str(id.trim()).map_err(|_| AppError::MalformedId(id.clone()))?;

    let project = state
        .projects
        .find_by_id(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    Ok(Json(ProjectResponse::from(project)))
}
