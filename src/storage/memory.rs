//! In-memory backend for tests and single-process runs.

use super::{FileStorage, StorageError, StorageResult, validate_name};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryFileStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    /// Drop a stored artifact, e.g. to simulate external cleanup.
    pub async fn remove(&self, path: &str) -> bool {
        self.files.write().await.remove(path).is_some()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn save_file(&self, bytes: &[u8], name: &str) -> StorageResult<String> {
        validate_name(name)?;
        self.files
            .write()
            .await
            .insert(name.to_string(), bytes.to_vec());
        Ok(name.to_string())
    }

    async fn download_file(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.files
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}
