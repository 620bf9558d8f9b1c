use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::StorageProvider;

/// Local file system storage provider
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn get_full_path(&self, path: &str) -> Result<PathBuf> {
        // Keys are generated names, but never let one escape the root
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::Storage(format!("Invalid storage path: {}", path)));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let full_path = self.get_full_path(path)?;

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write file
        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!("Saved file to {:?}", full_path);
        Ok(())
    }

    async fn put_file(&self, path: &str, local_path: &Path) -> Result<()> {
        let full_path = self.get_full_path(path)?;

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // A rename fails across filesystems; copy instead
        if let Err(e) = fs::rename(local_path, &full_path).await {
            tracing::debug!("Rename of {:?} failed ({}), copying", local_path, e);
            fs::copy(local_path, &full_path).await?;
        }

        tracing::debug!("Moved file from {:?} to {:?}", local_path, full_path);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        let full_path = self.get_full_path(path)?;

        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("File not found: {}", path))
            } else {
                AppError::Storage(format!("Failed to read file: {}", e))
            }
        })?;

        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let full_path = self.get_full_path(path)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted file {:?}", full_path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to delete {}: {}",
                path, e
            ))),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.get_full_path(path)?;
        Ok(fs::try_exists(&full_path).await?)
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanupStatus, PictureHandle};
    use crate::storage::{remove_best_effort, remove_picture_files};

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .put("thumbnails/a.jpg", Bytes::from_static(b"thumb"))
            .await
            .unwrap();
        assert!(dir.path().join("thumbnails/a.jpg").is_file());
        assert!(storage.exists("thumbnails/a.jpg").await.unwrap());
        assert_eq!(
            storage.get("thumbnails/a.jpg").await.unwrap(),
            Bytes::from_static(b"thumb")
        );

        assert!(storage.delete("thumbnails/a.jpg").await.unwrap());
        assert!(!storage.delete("thumbnails/a.jpg").await.unwrap());
        // The thumbnails directory itself stays
        assert!(dir.path().join("thumbnails").is_dir());
    }

    #[tokio::test]
    async fn test_put_file_moves_into_root() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("staged.bin");
        std::fs::write(&staged, b"original bytes").unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"));

        storage.put_file("b.png", &staged).await.unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("uploads/b.png")).unwrap(),
            b"original bytes"
        );
        assert!(!staged.exists());
        assert!(storage
            .put_file("../b.png", &dir.path().join("missing"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(matches!(
            storage.get("nope.png").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("root"));
        assert!(storage
            .put("../outside.png", Bytes::from_static(b"x"))
            .await
            .is_err());
        assert!(storage.exists("/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_picture_files_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let handle = PictureHandle {
            id: 1,
            filename: "a.png".to_string(),
        };
        storage
            .put(&handle.original_key(), Bytes::from_static(b"png"))
            .await
            .unwrap();

        let report = remove_picture_files(&storage, &handle).await;
        assert_eq!(report.original, CleanupStatus::Removed);
        assert_eq!(report.thumbnail, CleanupStatus::Missing);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_remove_best_effort_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        // A directory in place of the file cannot be unlinked
        std::fs::create_dir_all(dir.path().join("thumbnails/a.png")).unwrap();

        let status = remove_best_effort(&storage, "thumbnails/a.png").await;
        assert!(status.is_failed());
    }
}
