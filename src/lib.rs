// Flip Relay - upload files once, list and fetch them over HTTP

pub mod config;
pub mod models;
pub mod types;
pub mod naming;
pub mod storage;
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

use storage::FileGateway;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}

/// Build the storage backend once and wrap it in the shared application state
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let backend = storage::build_backend(&config.storage).await?;
    let deriver = naming::KeyDeriver::new(config.naming.locale, config.naming.strategy);

    Ok(AppState {
        files: FileGateway::new(backend, deriver),
        config,
    })
}
