//! API handlers for the Slate files service.

use crate::extract::{content_type_for, extract_text};
use crate::search::build_search_prompt;
use crate::AppState;
use axum::{
    extract::{Extension, Json, Multipart, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Maximum upload file size: 10 MiB.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Response body for a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
}

/// Request body for search.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

/// Response body for search.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub answer: String,
    #[serde(rename = "relevantFiles")]
    pub relevant_files: Vec<crate::search::RelevantFile>,
}

/// Strips any path components from a client-supplied filename.
fn sanitize_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim()
        .to_string()
}

/// Handler for `POST /upload`.
///
/// Persists the uploaded bytes under a unique on-disk name and derives a
/// plain-text extraction for recognized formats. Unrecognized formats are
/// stored without an extraction; ingest still succeeds.
pub async fn upload_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    // The form may carry other parts; only the one named "file" is the upload.
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = sanitize_filename(field.file_name().unwrap_or(""));
        if filename.is_empty() {
            return Err(ApiError::BadRequest("empty filename".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;

        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::BadRequest("no file provided".to_string()))?;

    if data.is_empty() {
        return Err(ApiError::BadRequest("empty file".to_string()));
    }
    if data.len() > MAX_UPLOAD_SIZE {
        return Err(ApiError::BadRequest(format!(
            "file too large: {} bytes (max {})",
            data.len(),
            MAX_UPLOAD_SIZE
        )));
    }

    let content_type = content_type_for(&filename);
    let extracted = extract_text(&filename, &data);
    if extracted.is_none() {
        tracing::debug!(filename = %filename, "no text extracted, file will not be searchable");
    }

    // Save to disk under a unique stored name.
    let stored_name = format!("{}_{}", Uuid::new_v4(), filename);
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| {
            ApiError::InternalServerError(format!("failed to create upload dir: {}", e))
        })?;
    let file_path = format!("{}/{}", state.upload_dir, stored_name);
    tokio::fs::write(&file_path, &data)
        .await
        .map_err(|e| ApiError::InternalServerError(format!("failed to write file: {}", e)))?;

    // Record in the database.
    let state_clone = state.clone();
    let filename_db = filename.clone();
    let stored_name_db = stored_name.clone();
    let size = data.len() as i64;

    let inserted = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        conn.execute(
            "INSERT INTO files (filename, stored_name, content_type, size_bytes, extracted_text, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                filename_db,
                stored_name_db,
                content_type,
                size,
                extracted,
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ApiError::Conflict(format!("file '{}' already exists", filename_db))
            }
            other => ApiError::InternalServerError(format!("failed to record file: {}", other)),
        })?;

        Ok::<(), ApiError>(())
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?;

    if let Err(e) = inserted {
        // Without a row the stored bytes are unreachable; remove them.
        if let Err(cleanup) = tokio::fs::remove_file(&file_path).await {
            tracing::warn!(path = %file_path, "failed to remove unrecorded upload: {}", cleanup);
        }
        return Err(e);
    }

    tracing::info!(
        filename = %filename,
        stored_name = %stored_name,
        size_bytes = size,
        content_type = content_type,
        "file uploaded"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        filename,
    }))
}

/// Handler for `GET /uploads/{filename}`.
pub async fn get_file_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let state_clone = state.clone();
    let filename_db = filename.clone();

    let record = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        use rusqlite::OptionalExtension;
        conn.query_row(
            "SELECT stored_name, content_type FROM files WHERE filename = ?1",
            rusqlite::params![filename_db],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .map_err(|e| ApiError::InternalServerError(format!("failed to query file: {}", e)))
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    let (stored_name, content_type) = record
        .ok_or_else(|| ApiError::NotFound(format!("file '{}' not found", filename)))?;

    let file_path = format!("{}/{}", state.upload_dir, stored_name);
    let bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|e| ApiError::InternalServerError(format!("failed to read file: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// Handler for `GET /files`.
pub async fn list_files_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let state_clone = state.clone();

    let filenames = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        let mut stmt = conn
            .prepare("SELECT filename FROM files ORDER BY id")
            .map_err(|e| ApiError::InternalServerError(format!("failed to prepare: {}", e)))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| ApiError::InternalServerError(format!("failed to query: {}", e)))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| ApiError::InternalServerError(format!("failed to read rows: {}", e)))?;

        Ok::<_, ApiError>(rows)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    Ok(Json(filenames))
}

/// Handler for `POST /search`.
///
/// Concatenates every stored extraction into one prompt and delegates the
/// entire relevance and answer judgment to the completion backend.
pub async fn search_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = payload.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query is required".to_string()));
    }

    let state_clone = state.clone();
    let documents = tokio::task::spawn_blocking(move || {
        let conn = state_clone
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        let mut stmt = conn
            .prepare(
                "SELECT filename, extracted_text FROM files
                 WHERE extracted_text IS NOT NULL ORDER BY id",
            )
            .map_err(|e| ApiError::InternalServerError(format!("failed to prepare: {}", e)))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| ApiError::InternalServerError(format!("failed to query: {}", e)))?
            .collect::<Result<Vec<(String, String)>, _>>()
            .map_err(|e| ApiError::InternalServerError(format!("failed to read rows: {}", e)))?;

        Ok::<_, ApiError>(rows)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    let prompt = build_search_prompt(&query, &documents);
    let verdict = state
        .backend
        .judge(&prompt)
        .await
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

    tracing::info!(
        query = %query,
        documents = documents.len(),
        relevant = verdict.relevant_files.len(),
        "search completed"
    );

    Ok(Json(SearchResponse {
        query,
        answer: verdict.answer,
        relevant_files: verdict.relevant_files,
    }))
}
