//! Artifact storage gateway.
//!
//! The engine only sees the [`FileStorage`] trait. Backends decide what a
//! "path" means: a file under a root directory, a key in memory, an object
//! store key.

pub mod local;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalFileStorage;
pub use memory::InMemoryFileStorage;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persist and retrieve artifact bytes under a logical name.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under `name` and return the path to read them back.
    ///
    /// Saving the same bytes under an existing name is safe.
    async fn save_file(&self, bytes: &[u8], name: &str) -> StorageResult<String>;

    /// Read the bytes stored at `path`.
    async fn download_file(&self, path: &str) -> StorageResult<Vec<u8>>;
}

/// Reject names that could escape a storage root.
pub(crate) fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name.contains("..")
        || name.starts_with('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::InvalidPath(name.to_string()));
    }
    Ok(())
}
