//! Error types for checkpoint operations

use std::path::PathBuf;

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur during checkpoint operations
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Save request rejected before any I/O
    #[error("Invalid checkpoint: {0}")]
    Validation(String),

    /// Checkpoint or scope not found
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure against a specific document or directory
    #[error("Storage error at {}: {}", .path.display(), .source)]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckpointError {
    /// Wrap an I/O error with the path it occurred at.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
