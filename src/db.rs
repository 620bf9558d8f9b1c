use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Arguments, FromRow, SqlitePool};

use crate::error::{AppError, Result};

/// A bound parameter value. The store only ever deals in these three shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One query plus its parameters, as executed inside `Database::transaction`
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Outcome of a data-modifying statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub last_insert_id: i64,
    pub rows_affected: u64,
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file, enabling foreign keys and WAL
    pub async fn new(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        // Create connection pool
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::info!("Connected to SQLite database: {}", path);
        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pictures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT UNIQUE NOT NULL,
                original_name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                file_size INTEGER NOT NULL,
                mime_type TEXT NOT NULL,
                width INTEGER,
                height INTEGER,
                upload_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create indexes
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pictures_upload_date ON pictures(upload_date)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pictures_mime_type ON pictures(mime_type)")
            .execute(&self.pool)
            .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Fetch every row the query yields
    pub async fn all<T>(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let rows = sqlx::query_as_with::<_, T, _>(sql, arguments(params)?)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Fetch the first row, `None` when the query yields nothing
    pub async fn get<T>(&self, sql: &str, params: &[SqlValue]) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let row = sqlx::query_as_with::<_, T, _>(sql, arguments(params)?)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Execute a data-modifying statement
    pub async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunResult> {
        let result = sqlx::query_with(sql, arguments(params)?)
            .execute(&self.pool)
            .await?;
        Ok(RunResult {
            last_insert_id: result.last_insert_rowid(),
            rows_affected: result.rows_affected(),
        })
    }

    /// Execute all statements atomically. The first failure rolls the whole
    /// batch back; nothing is committed unless every statement succeeds.
    pub async fn transaction(&self, statements: Vec<Statement>) -> Result<Vec<RunResult>> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(statements.len());

        for statement in &statements {
            // Dropping `tx` on the error path issues the ROLLBACK
            let result = sqlx::query_with(&statement.sql, arguments(&statement.params)?)
                .execute(&mut *tx)
                .await?;
            results.push(RunResult {
                last_insert_id: result.last_insert_rowid(),
                rows_affected: result.rows_affected(),
            });
        }

        tx.commit().await?;
        Ok(results)
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database connection closed");
    }
}

fn arguments<'q>(params: &[SqlValue]) -> Result<SqliteArguments<'q>> {
    let mut args = SqliteArguments::default();
    for param in params {
        let added = match param {
            SqlValue::Null => args.add(Option::<i64>::None),
            SqlValue::Integer(v) => args.add(*v),
            SqlValue::Text(v) => args.add(v.clone()),
        };
        added.map_err(|e| AppError::Database(sqlx::Error::Encode(e)))?;
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/pictures.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        db.run_migrations().await.unwrap();
        (dir, db)
    }

    fn insert(filename: &str) -> Statement {
        Statement::new(
            "INSERT INTO pictures (filename, original_name, file_size, mime_type) VALUES (?, ?, ?, ?)",
            vec![filename.into(), "cat.png".into(), 10i64.into(), "image/png".into()],
        )
    }

    #[tokio::test]
    async fn test_new_creates_parent_directory() {
        let (dir, _db) = test_db().await;
        assert!(dir.path().join("nested/pictures.db").exists());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let (_dir, db) = test_db().await;
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_get_all() {
        let (_dir, db) = test_db().await;

        let first = db
            .run(&insert("a.png").sql, &insert("a.png").params)
            .await
            .unwrap();
        assert_eq!(first.rows_affected, 1);
        assert_eq!(first.last_insert_id, 1);
        db.run(&insert("b.png").sql, &insert("b.png").params)
            .await
            .unwrap();

        let row: Option<(String, String)> = db
            .get(
                "SELECT filename, description FROM pictures WHERE id = ?",
                &[first.last_insert_id.into()],
            )
            .await
            .unwrap();
        assert_eq!(row, Some(("a.png".to_string(), String::new())));

        let missing: Option<(i64,)> = db
            .get("SELECT id FROM pictures WHERE id = ?", &[99i64.into()])
            .await
            .unwrap();
        assert!(missing.is_none());

        let rows: Vec<(String,)> = db
            .all("SELECT filename FROM pictures ORDER BY id", &[])
            .await
            .unwrap();
        assert_eq!(rows, vec![("a.png".to_string(),), ("b.png".to_string(),)]);
    }

    #[tokio::test]
    async fn test_null_parameter() {
        let (_dir, db) = test_db().await;
        db.run(
            "INSERT INTO pictures (filename, original_name, file_size, mime_type, width) VALUES (?, ?, ?, ?, ?)",
            &["a.png".into(), "a.png".into(), 1i64.into(), "image/png".into(), SqlValue::from(None::<i64>)],
        )
        .await
        .unwrap();

        let row: Option<(Option<i64>,)> = db.get("SELECT width FROM pictures", &[]).await.unwrap();
        assert_eq!(row, Some((None,)));
    }

    #[tokio::test]
    async fn test_transaction_commits_all() {
        let (_dir, db) = test_db().await;
        let results = db
            .transaction(vec![insert("a.png"), insert("b.png")])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].last_insert_id, 2);

        let count: Option<(i64,)> = db.get("SELECT COUNT(*) FROM pictures", &[]).await.unwrap();
        assert_eq!(count, Some((2,)));
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_failure() {
        let (_dir, db) = test_db().await;
        // Second insert violates the UNIQUE filename constraint
        let err = db
            .transaction(vec![insert("a.png"), insert("b.png"), insert("a.png")])
            .await;
        assert!(matches!(err, Err(AppError::Database(_))));

        let count: Option<(i64,)> = db.get("SELECT COUNT(*) FROM pictures", &[]).await.unwrap();
        assert_eq!(count, Some((0,)));
    }
}
