use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};

use crate::error::{AppError, PageError};
use crate::handlers::picture::parse_id;
use crate::models::ListOptions;
use crate::pages;
use crate::services::PictureService;
use crate::AppState;

/// Number of pictures shown on the gallery page
const GALLERY_SIZE: i64 = 50;

/// Gallery page. A store failure still renders the page, with a banner.
/// GET /
pub async fn gallery(State(state): State<AppState>) -> Html<String> {
    let loaded = async {
        let pictures = PictureService::get_all(&state.db, ListOptions::limit(GALLERY_SIZE)).await?;
        let total = PictureService::get_total_count(&state.db).await?;
        Ok::<_, AppError>((pictures, total))
    }
    .await;

    match loaded {
        Ok((pictures, total)) => Html(pages::gallery_page(&pictures, total, None)),
        Err(e) => {
            tracing::error!("Error loading pictures: {}", e);
            Html(pages::gallery_page(&[], 0, Some("Failed to load pictures")))
        }
    }
}

/// Upload form
/// GET /upload
pub async fn upload_form(State(state): State<AppState>) -> Html<String> {
    Html(pages::upload_page(
        state.config.upload.max_files,
        state.config.upload.max_file_size,
    ))
}

/// Picture detail page
/// GET /picture/:id
pub async fn picture_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, PageError> {
    let id = parse_id(&id)?;
    let picture = PictureService::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Picture not found".to_string()))?;
    Ok(Html(pages::detail_page(&picture)))
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html(pages::error_page(
            "Page Not Found",
            "The requested page could not be found.",
        )),
    )
}
