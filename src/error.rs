use thiserror::Error;

use crate::sheets::RemoteError;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown menu '{id}'. Available: {}", available.join(", "))]
    UnknownMenu { id: String, available: Vec<String> },

    #[error("Sheet tab '{tab}' not found in spreadsheet {spreadsheet}")]
    MissingTab { spreadsheet: String, tab: String },

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Sync failed for: {}. Check logs for details.", menus.join(", "))]
    SyncFailed { menus: Vec<String> },
}

impl SyncError {
    /// Configuration problems are raised before any remote write happens.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncError::Config(_) | SyncError::UnknownMenu { .. } | SyncError::MissingTab { .. }
        )
    }
}
