use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Local;
use tracing::info;

use crate::models::{
    AppState, DownloadQuery, FileListResponse, FileListing, ListQuery, MessageResponse,
    UploadResponse,
};
use crate::storage::StoredFile;
use crate::types::{AppError, AppResult};

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/file/{name}", get(download_file))
        .route("/uploads/{filename}", get(download_file))
        .route("/api/uploads", get(download_by_query));

    if state.files.supports_delete() {
        router = router.route("/files/{filename}", delete(delete_file));
    }

    router.with_state(state)
}

async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let mut multipart =
        multipart.map_err(|_| AppError::InvalidRequest("No file uploaded".to_string()))?;
    let limit = state.config.server.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_multipart(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // a plain form value under the file field name is not an upload
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::from_multipart(e, limit))?;

        info!(original = %original_name, size = bytes.len(), "File upload request received");

        let outcome = state
            .files
            .put(&original_name, bytes, mime_type.as_deref(), &Local::now())
            .await?;

        return Ok(Json(UploadResponse {
            success: true,
            filename: outcome.key,
            url: outcome.url,
        }));
    }

    Err(AppError::InvalidRequest("No file uploaded".to_string()))
}

async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<FileListResponse>> {
    let entries = state.files.list().await?;

    let files = if query.detail {
        FileListing::Detailed(entries)
    } else {
        FileListing::Names(entries.into_iter().map(|e| e.name).collect())
    };

    Ok(Json(FileListResponse { success: true, files }))
}

async fn download_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let file = state.files.get(&name).await?;
    Ok(file_response(&state, file))
}

async fn download_by_query(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<Response> {
    let name = query
        .filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Filename required".to_string()))?;

    let file = state.files.get(&name).await?;
    Ok(file_response(&state, file))
}

async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.files.delete(&filename).await?;

    Ok(Json(MessageResponse {
        success: true,
        msg: "File deleted".to_string(),
    }))
}

fn file_response(state: &AppState, file: StoredFile) -> Response {
    let content_type = content_type_for(state, &file);
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", file.key))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    info!(key = %file.key, size = file.bytes.len(), "Serving file");

    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_str(&content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("application/pdf")),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(file.bytes),
    )
        .into_response()
}

fn content_type_for(state: &AppState, file: &StoredFile) -> String {
    let server = &state.config.server;
    if !server.guess_content_type {
        return server.download_content_type.clone();
    }

    file.content_type
        .clone()
        .or_else(|| mime_guess::from_path(&file.key).first().map(|m| m.to_string()))
        .unwrap_or_else(|| server.download_content_type.clone())
}
