//! Local filesystem backend.

use super::{FileStorage, StorageError, StorageResult, validate_name};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Stores artifacts as plain files under a root directory.
///
/// Returned paths are relative to the root, so the root can move
/// without invalidating job records.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Create the backend, making the root directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        validate_name(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save_file(&self, bytes: &[u8], name: &str) -> StorageResult<String> {
        let target = self.resolve(name)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write next to the target then rename, so readers never see a
        // half-written artifact.
        let tmp = target.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        let write = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            fs::rename(&tmp, &target).await
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::WriteFailed(format!("{}: {e}", target.display())));
        }

        debug!(path = %target.display(), bytes = bytes.len(), "artifact written");
        Ok(name.to_string())
    }

    async fn download_file(&self, path: &str) -> StorageResult<Vec<u8>> {
        let source = self.resolve(path)?;
        match fs::read(&source).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::NotFound(format!("{path}: {e}"))),
        }
    }
}
