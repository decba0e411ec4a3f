use std::io::Cursor;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::id::BlobId;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Lazy, single-pass stream of a blob's chunks in original order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Default chunk size (255 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Content type recorded when the uploader does not provide one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/zip";

/// Descriptor of a published blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub id: BlobId,
    pub original_name: String,
    pub content_type: String,
    /// Total length in bytes.
    pub length: u64,
    pub chunk_size: u32,
    pub chunk_count: u32,
    /// Lowercase hex SHA-256 of the full content.
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Handle for one in-progress blob write.
///
/// Bytes written through the handle stay invisible to readers until
/// [`BlobWriter::finalize`] succeeds. Dropping a handle without finalizing
/// leaves staged chunks behind until the store is reopened; call
/// [`BlobWriter::abort`] to discard them immediately.
#[async_trait]
pub trait BlobWriter: Send {
    /// Identifier the blob will be published under.
    fn id(&self) -> BlobId;

    /// Bytes accepted so far.
    fn bytes_written(&self) -> u64;

    /// Append bytes. Full chunks are flushed as they fill.
    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Flush the trailing chunk and publish the blob atomically.
    async fn finalize(self: Box<Self>) -> Result<BlobInfo, StorageError>;

    /// Discard everything staged by this handle.
    async fn abort(self: Box<Self>);
}

/// Chunked blob storage keyed by generated identifiers.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Allocate an identifier and open a staged write.
    async fn open_write(
        &self,
        original_name: &str,
        content_type: Option<&str>,
    ) -> Result<Box<dyn BlobWriter>, StorageError>;

    /// Store data from an async reader, aborting the write on any error.
    async fn put_stream(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        mut reader: BoxReader,
    ) -> Result<BlobInfo, StorageError> {
        let mut writer = self.open_write(original_name, content_type).await?;
        let mut buf = vec![0u8; 64 * 1024];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    writer.abort().await;
                    return Err(e.into());
                }
            };
            if let Err(e) = writer.write(&buf[..n]).await {
                writer.abort().await;
                return Err(e);
            }
        }

        writer.finalize().await
    }

    /// Store an in-memory buffer.
    async fn put(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<BlobInfo, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(original_name, content_type, reader).await
    }

    /// Open a published blob for streaming.
    async fn open_read(&self, id: &BlobId) -> Result<ByteStream, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn read_to_vec(&self, id: &BlobId) -> Result<Vec<u8>, StorageError> {
        let mut stream = self.open_read(id).await?;
        let mut buf = Vec::new();
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    /// Descriptor of a published blob.
    async fn metadata(&self, id: &BlobId) -> Result<BlobInfo, StorageError>;

    async fn exists(&self, id: &BlobId) -> Result<bool, StorageError> {
        match self.metadata(id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All published blobs, ordered by identifier.
    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError>;

    /// Delete a published blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, id: &BlobId) -> Result<bool, StorageError>;
}
