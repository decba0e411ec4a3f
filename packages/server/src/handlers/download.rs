use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use common::storage::{BlobId, DEFAULT_CONTENT_TYPE};
use futures::TryStreamExt;
use tracing::{error, instrument};

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;
use crate::utils::filename::{content_disposition_value, download_filename};

#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "Projects",
    operation_id = "downloadProject",
    summary = "Download an uploaded archive",
    description = "Streams the archive stored under the given blob ID (the `fileId` of a \
        project). Only archives that belong to a project are served; the attachment filename \
        is derived from the project title.",
    params(("id" = String, Path, description = "Blob ID (the project's `fileId`)")),
    responses(
        (status = 200, description = "Archive content", content_type = "application/zip"),
        (status = 400, description = "Malformed ID (MALFORMED_ID)", body = ErrorBody),
        (status = 404, description = "No such archive (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Archive could not be read (STREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let blob_id = BlobId::parse(&id).map_err(|_| AppError::MalformedId(id.clone()))?;

    let project = state
        .projects
        .find_by_file_id(blob_id.into_uuid())
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    let blob = state
        .blob_store
        .metadata(&blob_id)
        .await
        .map_err(AppError::from_download)?;

    let stream = state
        .blob_store
        .open_read(&blob_id)
        .await
        .map_err(AppError::from_download)?;
    let stream = stream.inspect_err(move |e| {
        error!(blob_id = %blob_id, error = %e, "Download aborted mid-stream");
    });

    let content_type = if blob.content_type.is_empty() {
        DEFAULT_CONTENT_TYPE
    } else {
        blob.content_type.as_str()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, blob.length.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&download_filename(&project.title)),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
