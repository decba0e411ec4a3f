mod chunker;
mod error;
mod id;
mod traits;

pub mod filesystem;
pub mod memory;

pub use error::StorageError;
pub use filesystem::FilesystemBlobStore;
pub use id::BlobId;
pub use memory::MemoryBlobStore;
pub use traits::{
    BlobInfo, BlobStore, BlobWriter, BoxReader, ByteStream, DEFAULT_CHUNK_SIZE,
    DEFAULT_CONTENT_TYPE,
};
