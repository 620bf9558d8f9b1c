mod config;
mod db;
mod error;
mod handlers;
mod models;
mod pages;
mod services;
mod static_files;
mod storage;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::error::ApiResponse;
use crate::storage::{LocalStorage, StorageProvider};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<dyn StorageProvider>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picture_gallery=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting picture gallery...");

    // Load configuration
    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    // Media storage
    let storage: Arc<dyn StorageProvider> =
        Arc::new(LocalStorage::new(&config.storage.upload_path));
    tracing::info!(
        "Media storage: {} at {}",
        storage.storage_type(),
        config.storage.upload_path
    );

    // Create app state
    let state = AppState {
        db: db.clone(),
        config: config.clone(),
        storage,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down server...");
    db.close().await;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let upload_limit = DefaultBodyLimit::max(state.config.upload.body_limit());

    // HTML pages
    let page_routes = Router::new()
        .route("/", get(handlers::page::gallery))
        .route("/upload", get(handlers::page::upload_form))
        .route("/picture/:id", get(handlers::page::picture_detail));

    // JSON API
    let api_routes = Router::new()
        .route(
            "/api/pictures",
            get(handlers::picture::list_pictures)
                .post(handlers::picture::upload_pictures)
                .layer(upload_limit),
        )
        .route(
            "/api/pictures/by-filename/:filename",
            get(handlers::picture::get_picture_by_filename),
        )
        .route(
            "/api/pictures/:id",
            get(handlers::picture::get_picture)
                .put(handlers::picture::update_picture)
                .delete(handlers::picture::delete_picture),
        )
        .route("/api/stats", get(handlers::picture::get_stats));

    Router::new()
        .merge(page_routes)
        .merge(api_routes)
        .nest_service(
            "/static",
            static_files::public_assets(&state.config.storage.public_path),
        )
        .nest_service(
            "/uploads",
            static_files::media(&state.config.storage.upload_path),
        )
        .fallback(handlers::page::not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Last-resort handler: a panicking request still gets a JSON 500
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Application error: handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("Internal server error")),
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
