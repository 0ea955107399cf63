//! Slate files service library logic.
//!
//! A small document upload-and-search backend: files are persisted at
//! ingest with a synchronous plain-text extraction, and search hands the
//! concatenated extractions to an external completion service in a single
//! structured-output call.

pub mod api;
pub mod config;
pub mod db;
pub mod extract;
pub mod search;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use db::DbPool;
use search::CompletionBackend;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Directory for uploaded files.
    pub upload_dir: String,
    /// Completion backend for search judgments.
    pub backend: Arc<dyn CompletionBackend>,
}

/// Request body ceiling; uploads are bounded separately by the handler.
const MAX_REQUEST_BODY_BYTES: usize = 12 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(api::upload_handler))
        .route("/uploads/{filename}", get(api::get_file_handler))
        .route("/files", get(api::list_files_handler))
        .route("/search", post(api::search_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
