use crate::config::Config;
use crate::storage::{FileEntry, FileGateway};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub files: FileGateway,
}

// API Request/Response types

/// Envelope for failed requests: `{ success: false, msg }`
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub msg: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: msg.into(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `files` is a list of names, or of full entries when `?detail=true`
#[derive(Debug, serde::Serialize)]
#[serde(untagged)]
pub enum FileListing {
    Names(Vec<String>),
    Detailed(Vec<FileEntry>),
}

#[derive(Debug, serde::Serialize)]
pub struct FileListResponse {
    pub success: bool,
    pub files: FileListing,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub detail: bool,
}

#[derive(Debug, serde::Deserialize)]
pub struct DownloadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub msg: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: String,
}
