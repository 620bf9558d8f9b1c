use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::pages;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl AppError {
    /// Message that is safe to show a client. Store, filesystem and image
    /// failures collapse to a generic phrase.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::Storage(_) => "Storage error".to_string(),
            AppError::Io(_) => "IO error".to_string(),
            AppError::Image(_) => "Image processing error".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Status code and public message; server-side detail is logged here
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::NotFound(_) | AppError::BadRequest(_) => {}
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::Storage(msg) => tracing::error!("Storage error: {}", msg),
            AppError::Io(e) => tracing::error!("IO error: {:?}", e),
            AppError::Image(e) => tracing::error!("Image error: {:?}", e),
        }
        (self.status_code(), self.public_message())
    }
}

/// API response wrapper. The payload is flattened next to `success`.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn failure_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            data: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = Json(ApiResponse::<()>::error(&message));
        (status, body).into_response()
    }
}

/// Error raised by an HTML page handler; rendered as an error page
/// instead of a JSON body.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "The requested picture could not be found.".to_string(),
            ),
            other => {
                let (status, _) = other.status_and_message();
                (status, "Failed to load picture details.".to_string())
            }
        };
        let title = if status == StatusCode::NOT_FOUND {
            "Picture Not Found"
        } else {
            "Error"
        };
        (status, Html(pages::error_page(title, &message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
