// Uploaded-file persistence. Handlers hand over raw bytes; the storage
// assigns a collision-free name under a per-kind subdirectory and returns the
// relative path that gets persisted on the owning row and served under
// /media.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under `subdir`, keeping the original extension.
    /// Returns the relative path to persist.
    async fn store(&self, subdir: &str, original_name: &str, bytes: &[u8]) -> AppResult<String>;
}

pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn sanitized_extension(original_name: &str) -> Option<String> {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, subdir: &str, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        let name = match sanitized_extension(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let relative = format!("{}/{}", subdir.trim_matches('/'), name);
        let full = self.root.join(&relative);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", full.display(), e)))?;

        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_bytes_under_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let path = storage
            .store("facets/hero", "portrait.JPG", b"fake image bytes")
            .await
            .unwrap();

        assert!(path.starts_with("facets/hero/"));
        assert!(path.ends_with(".jpg"));
        let written = std::fs::read(dir.path().join(&path)).unwrap();
        assert_eq!(written, b"fake image bytes");
    }

    #[tokio::test]
    async fn odd_extensions_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let path = storage
            .store("site", "weird.name.tar.gz$$", b"data")
            .await
            .unwrap();
        // the generated name is a bare uuid when the extension is unusable
        assert!(path.starts_with("site/"));
        assert!(!path.contains('$'));
    }
}
