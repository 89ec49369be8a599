/// Disk upload storage
use crate::{
    error::{BoardError, BoardResult},
    uploads::StorageBackend,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Stores files under `{base}/{first two chars of key}/{key}`
#[derive(Clone)]
pub struct DiskStorage {
    base_path: PathBuf,
}

impl DiskStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn path_for(&self, key: &str) -> BoardResult<PathBuf> {
        // Keys must not escape the base directory
        if key.len() < 3 || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(BoardError::Storage(format!("Invalid storage key: {}", key)));
        }
        Ok(self.base_path.join(&key[0..2]).join(key))
    }
}

#[async_trait]
impl StorageBackend for DiskStorage {
    async fn put(&self, key: &str, data: &[u8]) -> BoardResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                BoardError::Storage(format!("Failed to create upload directory: {}", e))
            })?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| BoardError::Storage(format!("Failed to write upload {}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> BoardResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BoardError::Storage(format!(
                "Failed to read upload {}: {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> BoardResult<()> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BoardError::Storage(format!(
                "Failed to delete upload {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> BoardResult<bool> {
        Ok(fs::try_exists(self.path_for(key)?).await.unwrap_or(false))
    }
}
