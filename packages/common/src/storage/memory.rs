use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;

use super::chunker::Chunker;
use super::error::StorageError;
use super::id::BlobId;
use super::traits::{
    BlobInfo, BlobStore, BlobWriter, ByteStream, DEFAULT_CHUNK_SIZE, DEFAULT_CONTENT_TYPE,
};

struct StoredBlob {
    info: BlobInfo,
    chunks: Vec<Bytes>,
}

type BlobMap = Arc<DashMap<BlobId, Arc<StoredBlob>>>;

/// In-process blob store with the same visibility rules as the filesystem
/// store: chunks are held by the writer and inserted on finalize.
#[derive(Clone)]
pub struct MemoryBlobStore {
    blobs: BlobMap,
    chunk_size: usize,
    max_size: u64,
}

impl MemoryBlobStore {
    pub fn new(chunk_size: usize, max_size: u64) -> Self {
        Self {
            blobs: Arc::new(DashMap::new()),
            chunk_size,
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, u64::MAX)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn open_write(
        &self,
        original_name: &str,
        content_type: Option<&str>,
    ) -> Result<Box<dyn BlobWriter>, StorageError> {
        Ok(Box::new(MemoryBlobWriter {
            id: BlobId::generate(),
            blobs: self.blobs.clone(),
            original_name: original_name.to_string(),
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            chunk_size: self.chunk_size,
            chunker: Chunker::new(self.chunk_size, self.max_size),
            chunks: Vec::new(),
        }))
    }

    async fn open_read(&self, id: &BlobId) -> Result<ByteStream, StorageError> {
        let blob = self
            .blobs
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let chunks = blob.chunks.clone();
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }

    async fn metadata(&self, id: &BlobId) -> Result<BlobInfo, StorageError> {
        self.blobs
            .get(id)
            .map(|entry| entry.info.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
        let mut blobs: Vec<BlobInfo> = self.blobs.iter().map(|e| e.info.clone()).collect();
        blobs.sort_by_key(|b| b.id);
        Ok(blobs)
    }

    async fn delete(&self, id: &BlobId) -> Result<bool, StorageError> {
        Ok(self.blobs.remove(id).is_some())
    }
}

struct MemoryBlobWriter {
    id: BlobId,
    blobs: BlobMap,
    original_name: String,
    content_type: String,
    chunk_size: usize,
    chunker: Chunker,
    chunks: Vec<Bytes>,
}

#[async_trait]
impl BlobWriter for MemoryBlobWriter {
    fn id(&self) -> BlobId {
        self.id
    }

    fn bytes_written(&self) -> u64 {
        self.chunker.total()
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let full = self.chunker.push(data)?;
        self.chunks.extend(full);
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<BlobInfo, StorageError> {
        let Self {
            id,
            blobs,
            original_name,
            content_type,
            chunk_size,
            chunker,
            mut chunks,
        } = *self;

        let summary = chunker.finish();
        chunks.extend(summary.tail);

        let info = BlobInfo {
            id,
            original_name,
            content_type,
            length: summary.length,
            chunk_size: u32::try_from(chunk_size).unwrap_or(u32::MAX),
            chunk_count: u32::try_from(chunks.len()).unwrap_or(u32::MAX),
            sha256: summary.sha256,
            uploaded_at: Utc::now(),
        };
        blobs.insert(
            id,
            Arc::new(StoredBlob {
                info: info.clone(),
                chunks,
            }),
        );
        Ok(info)
    }

    async fn abort(self: Box<Self>) {}
}
