use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};

use super::error::StorageError;

/// Splits an incoming byte sequence into fixed-size chunks while tracking
/// length and digest. Holds at most one partial chunk.
pub(crate) struct Chunker {
    chunk_size: usize,
    max_size: u64,
    pending: BytesMut,
    total: u64,
    hasher: Sha256,
}

/// Totals produced once the input is exhausted.
pub(crate) struct ChunkerSummary {
    pub tail: Option<Bytes>,
    pub length: u64,
    pub sha256: String,
}

impl Chunker {
    pub fn new(chunk_size: usize, max_size: u64) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            max_size,
            pending: BytesMut::with_capacity(chunk_size),
            total: 0,
            hasher: Sha256::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Accept `data` and return the chunks it completed.
    pub fn push(&mut self, mut data: &[u8]) -> Result<Vec<Bytes>, StorageError> {
        let total = self.total + data.len() as u64;
        if total > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: total,
                limit: self.max_size,
            });
        }
        self.total = total;
        self.hasher.update(data);

        let mut full = Vec::new();
        while !data.is_empty() {
            let room = self.chunk_size - self.pending.len();
            let take = room.min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.pending.len() == self.chunk_size {
                full.push(self.pending.split().freeze());
            }
        }
        Ok(full)
    }

    pub fn finish(self) -> ChunkerSummary {
        let tail = (!self.pending.is_empty()).then(|| self.pending.freeze());
        ChunkerSummary {
            tail,
            length: self.total,
            sha256: hex::encode(self.hasher.finalize()),
        }
    }
}
