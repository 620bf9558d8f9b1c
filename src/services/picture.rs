use crate::db::{Database, SqlValue};
use crate::error::Result;
use crate::models::{CleanupReport, ListOptions, NewPicture, Picture};
use crate::storage::{remove_picture_files, StorageProvider};

const COLUMNS: &str = "id, filename, original_name, description, file_size, mime_type, \
                       width, height, upload_date, updated_date";

/// Picture repository
pub struct PictureService;

impl PictureService {
    /// Insert a row and return it as stored, store-assigned fields included
    pub async fn insert(db: &Database, new: NewPicture) -> Result<Picture> {
        let sql = format!(
            r#"
            INSERT INTO pictures (filename, original_name, description, file_size, mime_type, width, height)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            COLUMNS
        );
        let params = [
            SqlValue::from(new.filename),
            SqlValue::from(new.original_name),
            SqlValue::from(new.description.unwrap_or_default()),
            SqlValue::from(new.file_size),
            SqlValue::from(new.mime_type),
            SqlValue::from(new.width.map(i64::from)),
            SqlValue::from(new.height.map(i64::from)),
        ];

        let picture: Option<Picture> = db.get(&sql, &params).await?;
        picture.ok_or_else(|| sqlx::Error::RowNotFound.into())
    }

    /// Get a picture by ID
    pub async fn get_by_id(db: &Database, id: i64) -> Result<Option<Picture>> {
        let sql = format!("SELECT {} FROM pictures WHERE id = ?", COLUMNS);
        db.get(&sql, &[id.into()]).await
    }

    /// Get a picture by its generated filename
    pub async fn get_by_filename(db: &Database, filename: &str) -> Result<Option<Picture>> {
        let sql = format!("SELECT {} FROM pictures WHERE filename = ?", COLUMNS);
        db.get(&sql, &[filename.into()]).await
    }

    /// List pictures
    pub async fn get_all(db: &Database, options: ListOptions) -> Result<Vec<Picture>> {
        let mut sql = format!("SELECT {} FROM pictures", COLUMNS);
        let mut params = Vec::new();
        push_order_and_page(&mut sql, &mut params, options);
        db.all(&sql, &params).await
    }

    /// Case-insensitive substring match on description or original name.
    /// `%` and `_` in `term` keep their LIKE meaning.
    pub async fn search(db: &Database, term: &str, options: ListOptions) -> Result<Vec<Picture>> {
        let pattern = format!("%{}%", term);
        let mut sql = format!(
            "SELECT {} FROM pictures WHERE description LIKE ? OR original_name LIKE ?",
            COLUMNS
        );
        let mut params = vec![SqlValue::from(pattern.clone()), SqlValue::from(pattern)];
        push_order_and_page(&mut sql, &mut params, options);
        db.all(&sql, &params).await
    }

    /// Replace the description, refreshing `updated_date`.
    /// `None` when no picture has this id.
    pub async fn update_description(
        db: &Database,
        id: i64,
        description: &str,
    ) -> Result<Option<Picture>> {
        let sql = format!(
            r#"
            UPDATE pictures
            SET description = ?, updated_date = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
            RETURNING {}
            "#,
            COLUMNS
        );
        db.get(&sql, &[description.into(), id.into()]).await
    }

    /// Delete the row, then remove both files best-effort.
    /// `None` when no picture has this id; file cleanup never changes the result.
    pub async fn delete(
        db: &Database,
        storage: &dyn StorageProvider,
        id: i64,
    ) -> Result<Option<CleanupReport>> {
        let sql = format!("DELETE FROM pictures WHERE id = ? RETURNING {}", COLUMNS);
        let deleted: Option<Picture> = db.get(&sql, &[id.into()]).await?;

        let Some(picture) = deleted else {
            return Ok(None);
        };

        let handle = picture.handle();
        let report = remove_picture_files(storage, &handle).await;
        if report.is_clean() {
            tracing::info!("Deleted picture {} ({})", handle.id, handle.filename);
        } else {
            tracing::warn!(
                "Deleted picture {} but left files behind: {:?}",
                handle.id,
                report
            );
        }
        Ok(Some(report))
    }

    /// Total number of pictures
    pub async fn get_total_count(db: &Database) -> Result<i64> {
        let row: Option<(i64,)> = db.get("SELECT COUNT(*) FROM pictures", &[]).await?;
        Ok(row.map(|(count,)| count).unwrap_or(0))
    }

    /// Pictures with exactly this MIME type, newest first
    pub async fn get_by_mime_type(db: &Database, mime_type: &str) -> Result<Vec<Picture>> {
        let sql = format!(
            "SELECT {} FROM pictures WHERE mime_type = ? ORDER BY upload_date DESC, id DESC",
            COLUMNS
        );
        db.all(&sql, &[mime_type.into()]).await
    }
}

fn push_order_and_page(sql: &mut String, params: &mut Vec<SqlValue>, options: ListOptions) {
    // Column and direction come from closed enums, never from user text
    let direction = options.direction.keyword();
    sql.push_str(&format!(
        " ORDER BY {} {}, id {}",
        options.order_by.column(),
        direction,
        direction
    ));

    if let Some(limit) = options.limit {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(limit.into());
        params.push(options.offset.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanupStatus, OrderBy, OrderDirection};
    use crate::storage::LocalStorage;
    use bytes::Bytes;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pictures.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        db.run_migrations().await.unwrap();
        (dir, db)
    }

    fn new_picture(filename: &str, original_name: &str, description: Option<&str>) -> NewPicture {
        NewPicture {
            filename: filename.to_string(),
            original_name: original_name.to_string(),
            description: description.map(str::to_string),
            file_size: 1234,
            mime_type: "image/png".to_string(),
            width: Some(640),
            height: Some(480),
        }
    }

    #[tokio::test]
    async fn test_insert_returns_stored_row() {
        let (_dir, db) = test_db().await;
        let picture = PictureService::insert(&db, new_picture("a.png", "Cat.png", None))
            .await
            .unwrap();

        assert!(picture.id > 0);
        assert_eq!(picture.description, "");
        assert_eq!(picture.width, Some(640));
        assert!(!picture.upload_date.is_empty());
        assert_eq!(picture.upload_date, picture.updated_date);

        let fetched = PictureService::get_by_id(&db, picture.id).await.unwrap();
        assert_eq!(fetched, Some(picture.clone()));
        let by_name = PictureService::get_by_filename(&db, "a.png").await.unwrap();
        assert_eq!(by_name, Some(picture));
    }

    #[tokio::test]
    async fn test_insert_without_dimensions() {
        let (_dir, db) = test_db().await;
        let mut new = new_picture("a.gif", "a.gif", Some("anim"));
        new.width = None;
        new.height = None;
        let picture = PictureService::insert(&db, new).await.unwrap();
        assert_eq!((picture.width, picture.height), (None, None));
    }

    #[tokio::test]
    async fn test_duplicate_filename_is_rejected() {
        let (_dir, db) = test_db().await;
        PictureService::insert(&db, new_picture("a.png", "a.png", None))
            .await
            .unwrap();
        assert!(PictureService::insert(&db, new_picture("a.png", "b.png", None))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_absent_id_is_not_an_error() {
        let (dir, db) = test_db().await;
        let storage = LocalStorage::new(dir.path().join("uploads"));

        assert!(PictureService::get_by_id(&db, 42).await.unwrap().is_none());
        assert!(PictureService::get_by_filename(&db, "nope.png")
            .await
            .unwrap()
            .is_none());
        assert!(PictureService::update_description(&db, 42, "x")
            .await
            .unwrap()
            .is_none());
        assert!(PictureService::delete(&db, &storage, 42)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_get_all_ordering_and_paging() {
        let (_dir, db) = test_db().await;
        for name in ["a.png", "b.png", "c.png"] {
            PictureService::insert(&db, new_picture(name, name, None))
                .await
                .unwrap();
        }

        let all = PictureService::get_all(&db, ListOptions::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, ["c.png", "b.png", "a.png"]);

        let page = PictureService::get_all(
            &db,
            ListOptions {
                limit: Some(1),
                offset: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].filename, "b.png");

        // Offset alone does not paginate
        let unlimited = PictureService::get_all(
            &db,
            ListOptions {
                offset: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(unlimited.len(), 3);

        let by_name = PictureService::get_all(
            &db,
            ListOptions {
                order_by: OrderBy::OriginalName,
                direction: OrderDirection::Asc,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_name[0].original_name, "a.png");
    }

    #[tokio::test]
    async fn test_search_matches_description_or_name() {
        let (_dir, db) = test_db().await;
        PictureService::insert(&db, new_picture("1.png", "Beach.png", Some("sunset")))
            .await
            .unwrap();
        PictureService::insert(&db, new_picture("2.png", "dog.png", Some("At the BEACH")))
            .await
            .unwrap();
        PictureService::insert(&db, new_picture("3.png", "cat.png", Some("indoors")))
            .await
            .unwrap();

        let found = PictureService::search(&db, "beach", ListOptions::default())
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, ["2.png", "1.png"]);

        let limited = PictureService::search(&db, "beach", ListOptions::limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].filename, "2.png");
    }

    #[tokio::test]
    async fn test_search_wildcards_are_not_escaped() {
        let (_dir, db) = test_db().await;
        PictureService::insert(&db, new_picture("1.png", "a.png", Some("plain")))
            .await
            .unwrap();

        let found = PictureService::search(&db, "%", ListOptions::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        let found = PictureService::search(&db, "pl_in", ListOptions::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_update_description_changes_only_description() {
        let (_dir, db) = test_db().await;
        let before = PictureService::insert(&db, new_picture("a.png", "a.png", Some("old")))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let after = PictureService::update_description(&db, before.id, "new")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(after.description, "new");
        assert!(after.updated_date > before.updated_date);
        assert_eq!(
            Picture {
                description: before.description.clone(),
                updated_date: before.updated_date.clone(),
                ..after
            },
            before
        );
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_files() {
        let (dir, db) = test_db().await;
        let storage = LocalStorage::new(dir.path().join("uploads"));
        let picture = PictureService::insert(&db, new_picture("a.png", "a.png", None))
            .await
            .unwrap();
        let handle = picture.handle();
        storage
            .put(&handle.original_key(), Bytes::from_static(b"o"))
            .await
            .unwrap();
        storage
            .put(&handle.thumbnail_key(), Bytes::from_static(b"t"))
            .await
            .unwrap();

        let report = PictureService::delete(&db, &storage, picture.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.original, CleanupStatus::Removed);
        assert_eq!(report.thumbnail, CleanupStatus::Removed);
        assert!(!storage.exists(&handle.original_key()).await.unwrap());
        assert!(PictureService::get_by_id(&db, picture.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_succeeds_without_files() {
        let (dir, db) = test_db().await;
        let storage = LocalStorage::new(dir.path().join("uploads"));
        let picture = PictureService::insert(&db, new_picture("a.png", "a.png", None))
            .await
            .unwrap();

        let report = PictureService::delete(&db, &storage, picture.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.original, CleanupStatus::Missing);
        assert_eq!(report.thumbnail, CleanupStatus::Missing);
        assert!(PictureService::get_by_id(&db, picture.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_keeps_row_deleted_when_file_removal_fails() {
        let (dir, db) = test_db().await;
        let storage = LocalStorage::new(dir.path().join("uploads"));
        let picture = PictureService::insert(&db, new_picture("a.png", "a.png", None))
            .await
            .unwrap();
        let handle = picture.handle();
        storage
            .put(&handle.original_key(), Bytes::from_static(b"o"))
            .await
            .unwrap();
        // A directory where the thumbnail should be cannot be unlinked
        std::fs::create_dir_all(dir.path().join("uploads").join(handle.thumbnail_key())).unwrap();

        let report = PictureService::delete(&db, &storage, picture.id)
            .await
            .unwrap()
            .unwrap();
        assert!(report.thumbnail.is_failed());
        assert_eq!(report.original, CleanupStatus::Removed);
        assert!(!report.is_clean());
        assert!(PictureService::get_by_id(&db, picture.id).await.unwrap().is_none());
        assert!(PictureService::delete(&db, &storage, picture.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_count_and_mime_filter() {
        let (_dir, db) = test_db().await;
        assert_eq!(PictureService::get_total_count(&db).await.unwrap(), 0);

        PictureService::insert(&db, new_picture("a.png", "a.png", None))
            .await
            .unwrap();
        let mut jpeg = new_picture("b.jpg", "b.jpg", None);
        jpeg.mime_type = "image/jpeg".to_string();
        PictureService::insert(&db, jpeg).await.unwrap();

        assert_eq!(PictureService::get_total_count(&db).await.unwrap(), 2);
        let jpegs = PictureService::get_by_mime_type(&db, "image/jpeg").await.unwrap();
        assert_eq!(jpegs.len(), 1);
        assert_eq!(jpegs[0].filename, "b.jpg");
        assert!(PictureService::get_by_mime_type(&db, "image/jp")
            .await
            .unwrap()
            .is_empty());
    }
}
