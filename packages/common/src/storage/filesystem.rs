use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::chunker::Chunker;
use super::error::StorageError;
use super::id::BlobId;
use super::traits::{BlobInfo, BlobStore, BlobWriter, ByteStream, DEFAULT_CONTENT_TYPE};

const STAGING_DIR: &str = ".staging";
const DESCRIPTOR: &str = "files.json";

/// Filesystem-backed chunked blob store.
///
/// Each blob is a directory holding numbered chunk files and a JSON
/// descriptor:
/// `{root}/{bucket}/{shard}/{id}/chunk.{n:08}` and `{…}/{id}/files.json`.
///
/// Writers stage into `{root}/{bucket}/.staging/{id}/` and publish with a
/// single directory rename, so a blob is either absent or complete.
pub struct FilesystemBlobStore {
    bucket_path: PathBuf,
    chunk_size: usize,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Open (or create) the bucket and discard writes left staged by a
    /// previous process.
    pub async fn new(
        root: PathBuf,
        bucket: &str,
        chunk_size: usize,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        let bucket_path = root.join(bucket);
        let staging = bucket_path.join(STAGING_DIR);
        fs::create_dir_all(&bucket_path).await?;

        if fs::try_exists(&staging).await? {
            let mut stale = 0usize;
            let mut entries = fs::read_dir(&staging).await?;
            while let Some(entry) = entries.next_entry().await? {
                fs::remove_dir_all(entry.path()).await?;
                stale += 1;
            }
            if stale > 0 {
                warn!(bucket, stale, "Discarded unfinished blob writes");
            }
        }
        fs::create_dir_all(&staging).await?;

        Ok(Self {
            bucket_path,
            chunk_size,
            max_size,
        })
    }

    /// Compute the published directory for a blob.
    fn blob_dir(&self, id: &BlobId) -> PathBuf {
        self.bucket_path
            .join(id.shard_prefix())
            .join(id.to_string())
    }

    fn staging_dir(&self, id: &BlobId) -> PathBuf {
        self.bucket_path.join(STAGING_DIR).join(id.to_string())
    }

    async fn read_descriptor(&self, dir: &Path, id: &BlobId) -> Result<BlobInfo, StorageError> {
        let raw = match fs::read(dir.join(DESCRIPTOR)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map_err(|e| StorageError::Corrupt(format!("{id}: unreadable descriptor: {e}")))
    }
}

fn chunk_path(dir: &Path, n: u32) -> PathBuf {
    dir.join(format!("chunk.{n:08}"))
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn open_write(
        &self,
        original_name: &str,
        content_type: Option<&str>,
    ) -> Result<Box<dyn BlobWriter>, StorageError> {
        let id = BlobId::generate();
        let staging = self.staging_dir(&id);
        fs::create_dir_all(&staging).await?;
        debug!(blob_id = %id, "Opened blob write");

        Ok(Box::new(FilesystemBlobWriter {
            id,
            staging,
            target: self.blob_dir(&id),
            original_name: original_name.to_string(),
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            chunk_size: self.chunk_size,
            chunker: Chunker::new(self.chunk_size, self.max_size),
            chunk_count: 0,
        }))
    }

    async fn open_read(&self, id: &BlobId) -> Result<ByteStream, StorageError> {
        let dir = self.blob_dir(id);
        let info = self.read_descriptor(&dir, id).await?;
        let id = *id;
        let count = info.chunk_count;

        let stream = futures::stream::try_unfold(0u32, move |n| {
            let path = chunk_path(&dir, n);
            async move {
                if n >= count {
                    return Ok(None);
                }
                match fs::read(&path).await {
                    Ok(data) => Ok(Some((Bytes::from(data), n + 1))),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                        StorageError::Corrupt(format!("{id}: chunk {n} of {count} missing")),
                    ),
                    Err(e) => Err(e.into()),
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn metadata(&self, id: &BlobId) -> Result<BlobInfo, StorageError> {
        self.read_descriptor(&self.blob_dir(id), id).await
    }

    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
        let mut blobs = Vec::new();
        let mut shards = fs::read_dir(&self.bucket_path).await?;
        while let Some(shard) = shards.next_entry().await? {
            if shard.file_name() == STAGING_DIR || !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Some(id) = entry.file_name().to_str().and_then(|s| BlobId::parse(s).ok())
                else {
                    continue;
                };
                blobs.push(self.read_descriptor(&entry.path(), &id).await?);
            }
        }
        blobs.sort_by_key(|b| b.id);
        Ok(blobs)
    }

    async fn delete(&self, id: &BlobId) -> Result<bool, StorageError> {
        match fs::remove_dir_all(self.blob_dir(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write handle staging chunks in a private directory.
pub struct FilesystemBlobWriter {
    id: BlobId,
    staging: PathBuf,
    target: PathBuf,
    original_name: String,
    content_type: String,
    chunk_size: usize,
    chunker: Chunker,
    chunk_count: u32,
}

impl FilesystemBlobWriter {
    async fn flush_chunk(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let mut file = fs::File::create(chunk_path(&self.staging, self.chunk_count)).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        self.chunk_count += 1;
        Ok(())
    }

    async fn commit(&mut self) -> Result<BlobInfo, StorageError> {
        let chunker = std::mem::replace(&mut self.chunker, Chunker::new(1, 0));
        let summary = chunker.finish();
        if let Some(tail) = summary.tail {
            self.flush_chunk(&tail).await?;
        }

        let info = BlobInfo {
            id: self.id,
            original_name: self.original_name.clone(),
            content_type: self.content_type.clone(),
            length: summary.length,
            chunk_size: u32::try_from(self.chunk_size).unwrap_or(u32::MAX),
            chunk_count: self.chunk_count,
            sha256: summary.sha256,
            uploaded_at: Utc::now(),
        };

        let descriptor = serde_json::to_vec_pretty(&info)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", self.id)))?;
        let mut file = fs::File::create(self.staging.join(DESCRIPTOR)).await?;
        file.write_all(&descriptor).await?;
        file.sync_all().await?;
        drop(file);

        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&self.staging, &self.target).await?;

        Ok(info)
    }
}

#[async_trait]
impl BlobWriter for FilesystemBlobWriter {
    fn id(&self) -> BlobId {
        self.id
    }

    fn bytes_written(&self) -> u64 {
        self.chunker.total()
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        for chunk in self.chunker.push(data)? {
            self.flush_chunk(&chunk).await?;
        }
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<BlobInfo, StorageError> {
        let mut writer = self;
        let result = writer.commit().await;
        match &result {
            Ok(info) => debug!(blob_id = %info.id, length = info.length, "Published blob"),
            Err(_) => {
                // Best effort.
                let _ = fs::remove_dir_all(&writer.staging).await;
            }
        }
        result
    }

    async fn abort(self: Box<Self>) {
        if let Err(e) = fs::remove_dir_all(&self.staging).await {
            warn!(blob_id = %self.id, error = %e, "Failed to discard staged chunks");
        }
    }
}
