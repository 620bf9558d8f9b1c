use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subdirectory of the media root holding thumbnails
pub const THUMBNAIL_DIR: &str = "thumbnails";

/// Declared MIME types accepted by the upload route
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// Picture model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Picture {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    pub description: String,
    pub file_size: i64,
    pub mime_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub upload_date: String,
    pub updated_date: String,
}

impl Picture {
    pub fn handle(&self) -> PictureHandle {
        PictureHandle {
            id: self.id,
            filename: self.filename.clone(),
        }
    }
}

/// The row id together with the generated filename that keys both files
/// on disk. Every storage path for a picture is derived from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureHandle {
    pub id: i64,
    pub filename: String,
}

impl PictureHandle {
    /// Storage key of the original, relative to the media root
    pub fn original_key(&self) -> String {
        original_key(&self.filename)
    }

    /// Storage key of the thumbnail, relative to the media root
    pub fn thumbnail_key(&self) -> String {
        thumbnail_key(&self.filename)
    }

    pub fn original_url(&self) -> String {
        format!("/uploads/{}", self.original_key())
    }

    pub fn thumbnail_url(&self) -> String {
        format!("/uploads/{}", self.thumbnail_key())
    }
}

pub fn original_key(filename: &str) -> String {
    filename.to_string()
}

pub fn thumbnail_key(filename: &str) -> String {
    format!("{}/{}", THUMBNAIL_DIR, filename)
}

/// Values for a new row; the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewPicture {
    pub filename: String,
    pub original_name: String,
    pub description: Option<String>,
    pub file_size: i64,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Sortable columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    UploadDate,
    UpdatedDate,
    Id,
    OriginalName,
    FileSize,
}

impl OrderBy {
    pub fn column(self) -> &'static str {
        match self {
            OrderBy::UploadDate => "upload_date",
            OrderBy::UpdatedDate => "updated_date",
            OrderBy::Id => "id",
            OrderBy::OriginalName => "original_name",
            OrderBy::FileSize => "file_size",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum OrderDirection {
    #[serde(alias = "asc")]
    #[serde(rename = "ASC")]
    Asc,
    #[default]
    #[serde(alias = "desc")]
    #[serde(rename = "DESC")]
    Desc,
}

impl OrderDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Ordering and pagination shared by listing and search.
/// `offset` only applies when `limit` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: Option<i64>,
    pub offset: i64,
    pub order_by: OrderBy,
    pub direction: OrderDirection,
}

impl ListOptions {
    pub fn limit(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// Picture query parameters
/// GET /api/pictures?limit=&offset=&search=&mime_type=&order_by=&direction=
#[derive(Debug, Default, Deserialize)]
pub struct PictureQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub search: Option<String>,
    pub mime_type: Option<String>,
    pub order_by: Option<OrderBy>,
    pub direction: Option<OrderDirection>,
}

impl PictureQuery {
    /// Lenient paging: a non-numeric or non-positive limit means unlimited,
    /// a non-numeric or negative offset means 0.
    pub fn list_options(&self) -> ListOptions {
        let limit = self
            .limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0);
        let offset = self
            .offset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(0);

        ListOptions {
            limit,
            offset,
            order_by: self.order_by.unwrap_or_default(),
            direction: self.direction.unwrap_or_default(),
        }
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref().filter(|s| !s.is_empty())
    }
}

/// Outcome of removing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CleanupStatus {
    Removed,
    Missing,
    Failed(String),
}

impl CleanupStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, CleanupStatus::Failed(_))
    }
}

/// Per-file outcome of removing a picture's files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub original: CleanupStatus,
    pub thumbnail: CleanupStatus,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        !self.original.is_failed() && !self.thumbnail.is_failed()
    }
}

/// A file part the transport layer refused before it reached the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct RejectedFile {
    pub original_name: String,
    pub reason: String,
}

/// An accepted file the pipeline could not turn into a picture
#[derive(Debug, Clone, Serialize)]
pub struct UploadFailure {
    pub original_name: String,
    pub reason: String,
    pub cleanup: CleanupReport,
}

/// Picture list response
#[derive(Debug, Serialize)]
pub struct PictureListResponse {
    pub pictures: Vec<Picture>,
    pub count: usize,
}

/// Single picture response
#[derive(Debug, Serialize)]
pub struct PictureResponse {
    pub picture: Picture,
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub pictures: Vec<Picture>,
    pub rejected: Vec<RejectedFile>,
    pub failed: Vec<UploadFailure>,
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub cleanup: CleanupReport,
}

/// Stats response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total: i64,
}
