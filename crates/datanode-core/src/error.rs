//! Error types module
//!
//! Errors here are reserved for unexpected failures and programming errors.
//! Conditions a user can trigger (missing download file, unreadable upload,
//! lock held by someone else during upload) are reported as
//! [`Reason`](crate::reason::Reason)s instead.

use std::io;

use crate::models::DataNodeId;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like lock conflicts
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown storage type: {0}")]
    UnknownStorageType(String),

    #[error("Data node {datanode_id} is being edited by {editor_id}")]
    DataNodeIsBeingEdited {
        datanode_id: DataNodeId,
        editor_id: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Machine-readable error code (e.g., "REGISTRY_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::UnknownStorageType(_) => "UNKNOWN_STORAGE_TYPE",
            CoreError::DataNodeIsBeingEdited { .. } => "DATA_NODE_IS_BEING_EDITED",
            CoreError::InvalidConfig(_) => "INVALID_CONFIG",
            CoreError::Registry(_) => "REGISTRY_ERROR",
            CoreError::Io(_) => "IO_ERROR",
            CoreError::Json(_) => "JSON_ERROR",
        }
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            CoreError::DataNodeIsBeingEdited { .. } => LogLevel::Debug,
            CoreError::InvalidConfig(_) => LogLevel::Warn,
            CoreError::UnknownStorageType(_)
            | CoreError::Registry(_)
            | CoreError::Io(_)
            | CoreError::Json(_) => LogLevel::Error,
        }
    }
}
