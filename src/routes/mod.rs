//! HTTP Routes
//!
//! - `POST /upload` - multipart upload (field `file`)
//! - `GET /files` - list stored files
//! - `GET /file/{name}`, `GET /uploads/{filename}`, `GET /api/uploads?filename=` - download
//! - `DELETE /files/{filename}` - delete (backends that support it)
//! - `GET /api/health` - health check

pub mod files;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
///
/// Request bodies are capped at `max_upload_bytes`; uploads are buffered in
/// memory before they reach the storage backend.
pub fn create_router(state: AppState) -> Router {
    info!(
        backend = state.files.backend_name(),
        delete_enabled = state.files.supports_delete(),
        "Creating application router"
    );

    let body_limit = state.config.server.max_upload_bytes;
    let origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(files::router(state.clone()))
        .merge(health::router(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        );

    apply_cors(router, &origins)
}
