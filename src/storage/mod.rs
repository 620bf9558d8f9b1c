pub mod provider;
pub mod local;

pub use provider::*;
pub use local::*;

use crate::models::{original_key, thumbnail_key, CleanupReport, CleanupStatus, PictureHandle};

/// Remove one stored file, reporting the outcome instead of failing.
pub async fn remove_best_effort(provider: &dyn StorageProvider, path: &str) -> CleanupStatus {
    match provider.delete(path).await {
        Ok(true) => CleanupStatus::Removed,
        Ok(false) => CleanupStatus::Missing,
        Err(e) => {
            tracing::warn!("Could not delete {}: {}", path, e);
            CleanupStatus::Failed(e.to_string())
        }
    }
}

/// Remove both files of a stored picture
pub async fn remove_picture_files(
    provider: &dyn StorageProvider,
    handle: &PictureHandle,
) -> CleanupReport {
    remove_files_for(provider, &handle.filename).await
}

/// Remove the original and thumbnail stored under `filename`. The thumbnail
/// goes first so a half-finished cleanup never leaves a thumbnail without
/// its original.
pub async fn remove_files_for(provider: &dyn StorageProvider, filename: &str) -> CleanupReport {
    let thumbnail = remove_best_effort(provider, &thumbnail_key(filename)).await;
    let original = remove_best_effort(provider, &original_key(filename)).await;
    CleanupReport {
        original,
        thumbnail,
    }
}
