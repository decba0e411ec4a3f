use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use serde::Serialize;

use crate::store::StoreError;

/// Message returned when the upload is missing a `.zip` file.
pub const INVALID_FILE_TYPE_MESSAGE: &str = "Only .zip files allowed";

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable error description.
    #[schema(example = "Only .zip files allowed")]
    pub error: String,
    /// Machine-readable error code. One of: `INVALID_FILE_TYPE`,
    /// `VALIDATION_ERROR`, `MALFORMED_ID`, `NOT_FOUND`, `UPLOAD_FAILED`,
    /// `METADATA_SAVE_FAILED`, `STREAM_ERROR`, `LIST_FAILED`, `INTERNAL_ERROR`.
    #[schema(example = "INVALID_FILE_TYPE")]
    pub code: &'static str,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// No file was supplied or its extension is not `.zip`.
    InvalidFileType,
    Validation(String),
    /// A path identifier could not be parsed.
    MalformedId(String),
    NotFound(String),
    /// Streaming the upload into blob storage failed.
    UploadFailed(String),
    /// The blob was stored but its metadata record was not.
    MetadataSaveFailed(String),
    /// The blob could not be opened for download.
    StreamError(String),
    ListFailed(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::InvalidFileType => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: INVALID_FILE_TYPE_MESSAGE.into(),
                    code: "INVALID_FILE_TYPE",
                },
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    code: "VALIDATION_ERROR",
                },
            ),
            AppError::MalformedId(id) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: format!("Malformed id '{id}'"),
                    code: "MALFORMED_ID",
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: msg,
                    code: "NOT_FOUND",
                },
            ),
            AppError::UploadFailed(detail) => {
                tracing::error!("Upload failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Failed to store uploaded file".into(),
                        code: "UPLOAD_FAILED",
                    },
                )
            }
            AppError::MetadataSaveFailed(detail) => {
                tracing::error!("Metadata save failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Failed to save project metadata".into(),
                        code: "METADATA_SAVE_FAILED",
                    },
                )
            }
            AppError::StreamError(detail) => {
                tracing::error!("Download stream failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Download failed".into(),
                        code: "STREAM_ERROR",
                    },
                )
            }
            AppError::ListFailed(detail) => {
                tracing::error!("Listing projects failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Failed to list projects".into(),
                        code: "LIST_FAILED",
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "An unexpected error occurred".into(),
                        code: "INTERNAL_ERROR",
                    },
                )
            }
        }
    }

    /// Map a failure while streaming an upload into blob storage.
    pub fn from_upload(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { limit, .. } => {
                AppError::Validation(format!("File exceeds maximum size of {limit} bytes"))
            }
            other => AppError::UploadFailed(other.to_string()),
        }
    }

    /// Map a failure while opening a blob for download.
    pub fn from_download(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("File not found".into()),
            other => AppError::StreamError(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => AppError::Validation(msg),
            StoreError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}
