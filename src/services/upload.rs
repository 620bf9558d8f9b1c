use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::models::{original_key, thumbnail_key, NewPicture, Picture, UploadFailure};
use crate::services::{PictureService, ThumbnailService};
use crate::storage::{remove_files_for, StorageProvider};

/// A file part the transport layer accepted, already streamed to a
/// staging file outside the media tree
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub mime_type: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Outcome of one upload batch
#[derive(Debug, Default)]
pub struct UploadReport {
    pub pictures: Vec<Picture>,
    pub failures: Vec<UploadFailure>,
}

/// Upload pipeline
pub struct UploadService;

impl UploadService {
    /// Store, thumbnail and record every file in turn. A failing file is
    /// cleaned up and reported; it never stops the rest of the batch.
    pub async fn process_batch(
        db: &Database,
        storage: &dyn StorageProvider,
        files: Vec<IncomingFile>,
        description: Option<&str>,
    ) -> UploadReport {
        let mut report = UploadReport::default();

        for file in files {
            let filename = generate_filename(&file.original_name);
            let original_name = file.original_name.clone();
            let staged = file.path.clone();

            let outcome = Self::process_file(db, storage, &filename, file, description).await;
            // Gone after a rename; a copy or an early failure leaves it behind
            discard_staged(&staged).await;

            match outcome {
                Ok(picture) => {
                    tracing::info!(
                        "Stored picture {} as {} ({})",
                        picture.id,
                        picture.filename,
                        picture.original_name
                    );
                    report.pictures.push(picture);
                }
                Err(e) => {
                    tracing::error!("Error processing file {} ({}): {}", filename, original_name, e);
                    let cleanup = remove_files_for(storage, &filename).await;
                    report.failures.push(UploadFailure {
                        original_name,
                        reason: e.public_message(),
                        cleanup,
                    });
                }
            }
        }

        report
    }

    async fn process_file(
        db: &Database,
        storage: &dyn StorageProvider,
        filename: &str,
        file: IncomingFile,
        description: Option<&str>,
    ) -> Result<Picture> {
        let file_size = file.size as i64;
        storage.put_file(&original_key(filename), &file.path).await?;

        // Decode what actually landed on disk
        let stored = storage.get(&original_key(filename)).await?;
        let thumbnail = ThumbnailService::generate(stored).await?;
        storage.put(&thumbnail_key(filename), thumbnail.data).await?;

        PictureService::insert(
            db,
            NewPicture {
                filename: filename.to_string(),
                original_name: file.original_name,
                description: description.map(str::to_string),
                file_size,
                mime_type: file.mime_type,
                width: Some(thumbnail.width),
                height: Some(thumbnail.height),
            },
        )
        .await
    }
}

/// Remove a staging file, tolerating one that is already gone
pub async fn discard_staged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed staging file {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove staging file {:?}: {}", path, e),
    }
}

/// `<uuid-v4><.ext>`, keeping the client's extension verbatim
pub fn generate_filename(original_name: &str) -> String {
    let id = Uuid::new_v4();
    match Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}
