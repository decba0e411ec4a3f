use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// An I/O error occurred while reading or writing chunks.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The provided blob identifier could not be parsed.
    #[error("invalid blob id: {0}")]
    InvalidId(String),

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    /// A published blob is missing chunks or has an unreadable descriptor.
    #[error("corrupt blob: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
