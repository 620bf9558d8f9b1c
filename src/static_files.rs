use std::path::Path;

use tower_http::services::ServeDir;

/// Stylesheets, scripts and images under `/static`
pub fn public_assets(public_path: impl AsRef<Path>) -> ServeDir {
    ServeDir::new(public_path.as_ref())
}

/// Stored originals and `thumbnails/` under `/uploads`, mirroring the disk layout.
/// Directory listings are never produced; a missing file is a plain 404.
pub fn media(upload_path: impl AsRef<Path>) -> ServeDir {
    ServeDir::new(upload_path.as_ref()).append_index_html_on_directories(false)
}
