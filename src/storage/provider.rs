use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::Result;

/// Storage provider trait. Paths are relative keys under the provider's root.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Write data to storage, replacing any existing content
    async fn put(&self, path: &str, data: Bytes) -> Result<()>;

    /// Store a local file under `path`. The local file may be consumed.
    /// Default implementation reads the file to memory and calls put
    async fn put_file(&self, path: &str, local_path: &Path) -> Result<()> {
        let data = tokio::fs::read(local_path).await?;
        self.put(path, Bytes::from(data)).await
    }

    /// Read data from storage
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Delete data from storage. Returns `false` when nothing was stored at `path`.
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Check if a file exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}
