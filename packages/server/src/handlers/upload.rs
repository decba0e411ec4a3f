use axum::Json;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use common::storage::{BlobInfo, BlobWriter};
use tracing::{debug, error, info, instrument, warn};

use crate::config::StorageConfig;
use crate::error::{AppError, ErrorBody};
use crate::models::project::{ProjectResponse, UploadResponse};
use crate::state::AppState;
use crate::store::{NewProject, StoreError};
use crate::utils::filename::validate_zip_filename;

/// Allowance for multipart boundaries and the text fields on top of the
/// archive itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub fn upload_body_limit(storage: &StorageConfig) -> DefaultBodyLimit {
    let limit = storage.max_blob_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Text fields collected from the upload form.
#[derive(Debug, Default)]
struct UploadFields {
    title: Option<String>,
    description: Option<String>,
    price: Option<String>,
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Projects",
    operation_id = "uploadProject",
    summary = "Upload a zip archive with project metadata",
    description = "Accepts a `multipart/form-data` body with a `file` field (must be a `.zip`) \
        and the text fields `title`, `description` and `price`. The archive is streamed into \
        chunked blob storage and the project record is created only after the blob is fully \
        written. If the record cannot be saved the stored blob is removed again.",
    request_body(content_type = "multipart/form-data", description = "Archive and project metadata"),
    responses(
        (status = 200, description = "Archive stored and project created", body = UploadResponse),
        (status = 400, description = "Not a .zip file (INVALID_FILE_TYPE) or invalid fields (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Storage failure (UPLOAD_FAILED, METADATA_SAVE_FAILED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_project(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut stored: Option<BlobInfo> = None;

    let fields = match collect_form(&state, &mut multipart, &mut stored).await {
        Ok(fields) => fields,
        Err(err) => {
            if let Some(info) = stored.take() {
                discard_orphan(&state, &info, "upload form rejected").await;
            }
            return Err(err);
        }
    };

    let blob = stored.ok_or(AppError::InvalidFileType)?;

    let new_project = NewProject {
        title: fields.title.unwrap_or_default(),
        description: fields.description.unwrap_or_default(),
        price: parse_price(fields.price.as_deref()),
        file_id: blob.id.into_uuid(),
        created_at: None,
    };

    match state.projects.insert(new_project).await {
        Ok(model) => {
            info!(project_id = %model.id, blob_id = %blob.id, size = blob.length, "Project uploaded");
            Ok(Json(UploadResponse {
                message: "File uploaded and saved".into(),
                project: ProjectResponse::from(model),
            }))
        }
        Err(err) => {
            discard_orphan(&state, &blob, "metadata save failed").await;
            Err(match err {
                StoreError::Validation(msg) => AppError::Validation(msg),
                StoreError::Database(e) => AppError::MetadataSaveFailed(e.to_string()),
            })
        }
    }
}

/// Walk the multipart body, streaming the `file` field into blob storage as
/// soon as it arrives. A successfully stored blob is reported through
/// `stored` even when a later field fails, so the caller can discard it.
async fn collect_form(
    state: &AppState,
    multipart: &mut Multipart,
    stored: &mut Option<BlobInfo>,
) -> Result<UploadFields, AppError> {
    let mut fields = UploadFields::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                if stored.is_some() {
                    return Err(AppError::Validation("Only one file may be uploaded".into()));
                }
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or(AppError::InvalidFileType)?;
                let filename = validate_zip_filename(&filename)
                    .map_err(|e| {
                        debug!(filename = %filename, reason = e.message(), "Rejected upload file");
                        AppError::InvalidFileType
                    })?
                    .to_string();

                // A blank title sent ahead of the file fails before any bytes are stored.
                if fields.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
                    return Err(AppError::Validation("Title is required".into()));
                }

                *stored = Some(stream_field_to_store(field, &filename, state).await?);
            }
            Some("title") => fields.title = Some(read_text(field, "title").await?),
            Some("description") => fields.description = Some(read_text(field, "description").await?),
            Some("price") => fields.price = Some(read_text(field, "price").await?),
            _ => {} // Ignore unknown fields.
        }
    }

    Ok(fields)
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::Validation(format!("Multipart error: {}", err.body_text()))
}

/// A body that breaks off mid-file is a transport failure, not bad input,
/// unless it was cut by the body limit.
fn chunk_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation(format!("Upload too large: {}", err.body_text()))
    } else {
        AppError::UploadFailed(format!("Upload read error: {err}"))
    }
}

/// Stream a multipart field into blob storage chunk by chunk.
///
/// Any failure aborts the write, so nothing becomes visible in the store.
#[instrument(skip(field, state), fields(blob_id))]
async fn stream_field_to_store(
    mut field: Field<'_>,
    filename: &str,
    state: &AppState,
) -> Result<BlobInfo, AppError> {
    let content_type = mime_guess::from_path(filename)
        .first()
        .map(|m| m.to_string());

    let mut writer = state
        .blob_store
        .open_write(filename, content_type.as_deref())
        .await
        .map_err(AppError::from_upload)?;
    tracing::Span::current().record("blob_id", tracing::field::display(writer.id()));

    let copied = match state.config.storage.write_timeout() {
        Some(limit) => tokio::time::timeout(limit, copy_field(&mut field, writer.as_mut()))
            .await
            .unwrap_or_else(|_| {
                Err(AppError::UploadFailed(format!(
                    "upload timed out after {}s",
                    limit.as_secs()
                )))
            }),
        None => copy_field(&mut field, writer.as_mut()).await,
    };

    if let Err(err) = copied {
        writer.abort().await;
        return Err(err);
    }

    writer.finalize().await.map_err(AppError::from_upload)
}

async fn copy_field(field: &mut Field<'_>, writer: &mut dyn BlobWriter) -> Result<(), AppError> {
    while let Some(chunk) = field.chunk().await.map_err(chunk_error)? {
        writer
            .write(&chunk)
            .await
            .map_err(AppError::from_upload)?;
    }
    Ok(())
}

/// Compensation for the blob-then-metadata write: remove a blob whose
/// project record will not exist.
async fn discard_orphan(state: &AppState, info: &BlobInfo, reason: &str) {
    if !state.config.storage.compensate_orphans {
        warn!(blob_id = %info.id, reason, "Leaving orphaned blob in storage");
        return;
    }

    match state.blob_store.delete(&info.id).await {
        Ok(true) => warn!(blob_id = %info.id, reason, "Removed orphaned blob"),
        Ok(false) => warn!(blob_id = %info.id, reason, "Orphaned blob was already gone"),
        Err(e) => error!(
            blob_id = %info.id,
            reason,
            error = %e,
            "Failed to remove orphaned blob; manual cleanup required"
        ),
    }
}

/// Parse the submitted price text.
///
/// Blank or non-numeric input is stored as `None` instead of rejecting the
/// upload.
pub fn parse_price(raw: Option<&str>) -> Option<f64> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(price = text, "Ignoring non-numeric price");
            None
        }
    }
}
