use std::path::PathBuf;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiResponse, AppError, Result};
use crate::models::{
    is_allowed_mime_type, DeleteResponse, PictureListResponse, PictureQuery, PictureResponse,
    RejectedFile, StatsResponse, UploadResponse,
};
use crate::pages::format_limit;
use crate::services::{discard_staged, IncomingFile, PictureService, UploadService};
use crate::AppState;

/// Multipart field carrying the image files
const FILES_FIELD: &str = "pictures";
/// Multipart text field applied to every file of the batch
const DESCRIPTION_FIELD: &str = "description";

/// Ids arrive as path text; anything unparseable cannot name a picture
pub(crate) fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::NotFound("Picture not found".to_string()))
}

/// List pictures
/// GET /api/pictures?limit=&offset=&search=&mime_type=&order_by=&direction=
pub async fn list_pictures(
    State(state): State<AppState>,
    query: std::result::Result<Query<PictureQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<PictureListResponse>>> {
    let Query(query) =
        query.map_err(|e| AppError::BadRequest(format!("Invalid query: {}", e)))?;
    let options = query.list_options();

    let pictures = if let Some(term) = query.search_term() {
        PictureService::search(&state.db, term, options).await?
    } else if let Some(mime_type) = query.mime_type() {
        PictureService::get_by_mime_type(&state.db, mime_type).await?
    } else {
        PictureService::get_all(&state.db, options).await?
    };

    let count = pictures.len();
    Ok(Json(ApiResponse::success(PictureListResponse {
        pictures,
        count,
    })))
}

/// Get a specific picture
/// GET /api/pictures/:id
pub async fn get_picture(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PictureResponse>>> {
    let id = parse_id(&id)?;
    let picture = PictureService::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Picture not found".to_string()))?;
    Ok(Json(ApiResponse::success(PictureResponse { picture })))
}

/// Get a picture by its stored filename
/// GET /api/pictures/by-filename/:filename
pub async fn get_picture_by_filename(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<ApiResponse<PictureResponse>>> {
    let picture = PictureService::get_by_filename(&state.db, &filename)
        .await?
        .ok_or_else(|| AppError::NotFound("Picture not found".to_string()))?;
    Ok(Json(ApiResponse::success(PictureResponse { picture })))
}

/// Gallery statistics
/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<StatsResponse>>> {
    let total = PictureService::get_total_count(&state.db).await?;
    Ok(Json(ApiResponse::success(StatsResponse { total })))
}

/// Parts collected from one upload request
#[derive(Default)]
struct UploadForm {
    accepted: Vec<IncomingFile>,
    rejected: Vec<RejectedFile>,
    description: Option<String>,
}

/// Upload pictures
/// POST /api/pictures (multipart: `pictures` files, optional `description`)
pub async fn upload_pictures(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut multipart = multipart
        .map_err(|e| AppError::BadRequest(format!("Expected a multipart upload: {}", e)))?;

    let mut form = UploadForm::default();
    if let Err(e) = read_upload_form(&mut multipart, &state.config, &mut form).await {
        for file in &form.accepted {
            discard_staged(&file.path).await;
        }
        return Err(e);
    }
    let UploadForm {
        accepted,
        rejected,
        description,
    } = form;

    if accepted.is_empty() {
        if rejected.is_empty() {
            return Err(AppError::BadRequest("No files uploaded".to_string()));
        }
        let body = ApiResponse::failure_with_data(
            "None of the uploaded files were accepted",
            UploadResponse {
                pictures: Vec::new(),
                rejected,
                failed: Vec::new(),
            },
        );
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let report = UploadService::process_batch(
        &state.db,
        state.storage.as_ref(),
        accepted,
        description.as_deref(),
    )
    .await;

    let uploaded = report.pictures.len();
    let payload = UploadResponse {
        pictures: report.pictures,
        rejected,
        failed: report.failures,
    };

    if uploaded == 0 {
        let body =
            ApiResponse::failure_with_data("Failed to process any uploaded files", payload);
        return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response());
    }

    let body = ApiResponse::success_with_message(
        format!("Successfully uploaded {} picture(s)", uploaded),
        payload,
    );
    Ok(Json(body).into_response())
}

/// Walk the multipart body, staging accepted `pictures` parts on disk.
/// On error the caller discards whatever already landed in `form.accepted`.
async fn read_upload_form(
    multipart: &mut Multipart,
    config: &Config,
    form: &mut UploadForm,
) -> Result<()> {
    let limits = &config.upload;
    let staging_dir = std::path::Path::new(&config.storage.staging_path);
    let mut file_parts = 0usize;

    // Process multipart fields
    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to process multipart: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            FILES_FIELD => {
                let Some(original_name) = field.file_name().map(|s| s.to_string()) else {
                    continue;
                };

                file_parts += 1;
                if file_parts > limits.max_files {
                    return Err(AppError::BadRequest(format!(
                        "Too many files. Maximum is {} per upload.",
                        limits.max_files
                    )));
                }

                let mime_type = field.content_type().unwrap_or("").to_string();
                if !is_allowed_mime_type(&mime_type) {
                    tracing::warn!("Rejected {} with type {:?}", original_name, mime_type);
                    form.rejected.push(RejectedFile {
                        original_name,
                        reason: "Invalid file type. Only JPEG, PNG, WebP, and GIF files are allowed."
                            .to_string(),
                    });
                    continue;
                }

                match stage_part(&mut field, staging_dir, limits.max_file_size).await? {
                    Some((path, size)) => form.accepted.push(IncomingFile {
                        original_name,
                        mime_type,
                        path,
                        size,
                    }),
                    None => {
                        tracing::warn!(
                            "Rejected {}: larger than {} bytes",
                            original_name,
                            limits.max_file_size
                        );
                        form.rejected.push(RejectedFile {
                            original_name,
                            reason: format!(
                                "File size too large. Maximum size is {}.",
                                format_limit(limits.max_file_size)
                            ),
                        });
                    }
                }
            }
            DESCRIPTION_FIELD => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read description: {}", e))
                })?;
                form.description = Some(text);
            }
            _ => {}
        }
    }

    Ok(())
}

/// Stream one part into a uuid-named staging file. `None` when the part
/// crossed the size ceiling; the partial file never outlives this call.
async fn stage_part(
    field: &mut Field<'_>,
    staging_dir: &std::path::Path,
    max_size: usize,
) -> Result<Option<(PathBuf, u64)>> {
    let path = staging_dir.join(format!("upload_{}", Uuid::new_v4()));

    let outcome = write_part(field, &path, max_size).await;
    if !matches!(outcome, Ok(Some(_))) {
        discard_staged(&path).await;
    }
    Ok(outcome?.map(|size| (path, size)))
}

async fn write_part(
    field: &mut Field<'_>,
    path: &std::path::Path,
    max_size: usize,
) -> Result<Option<u64>> {
    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
        AppError::Internal(format!("Failed to create staging file: {}", e))
    })?;

    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read file chunk: {}", e))
    })? {
        if written + chunk.len() > max_size {
            return Ok(None);
        }
        file.write_all(&chunk).await.map_err(|e| {
            AppError::Internal(format!("Failed to write to staging file: {}", e))
        })?;
        written += chunk.len();
    }

    file.flush().await.map_err(|e| {
        AppError::Internal(format!("Failed to flush staging file: {}", e))
    })?;

    Ok(Some(written as u64))
}

/// Update a picture's description
/// PUT /api/pictures/:id
pub async fn update_picture(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<PictureResponse>>> {
    let Json(payload) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    let description = payload
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Description must be a string".to_string()))?;

    let id = parse_id(&id)?;
    let picture = PictureService::update_description(&state.db, id, description)
        .await?
        .ok_or_else(|| AppError::NotFound("Picture not found".to_string()))?;

    Ok(Json(ApiResponse::success_with_message(
        "Picture updated successfully",
        PictureResponse { picture },
    )))
}

/// Delete a picture and its files
/// DELETE /api/pictures/:id
pub async fn delete_picture(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    let id = parse_id(&id)?;
    let cleanup = PictureService::delete(&state.db, state.storage.as_ref(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Picture not found".to_string()))?;

    Ok(Json(ApiResponse::success_with_message(
        "Picture deleted successfully",
        DeleteResponse { cleanup },
    )))
}
