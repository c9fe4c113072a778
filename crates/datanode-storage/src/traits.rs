//! Storage format abstraction
//!
//! Every storage type with a format implementation (CSV, JSON, ...) implements
//! [`FileFormat`]. File-backed data nodes delegate all format-specific reading and
//! writing to it.

use async_trait::async_trait;
use datanode_core::{CoreError, StorageType};
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Storage type mismatch: data node uses {expected}, format handles {actual}")]
    StorageTypeMismatch {
        expected: StorageType,
        actual: StorageType,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Format-specific reading and writing of a data node file
#[async_trait]
pub trait FileFormat: Send + Sync {
    /// Content of a file once parsed
    type Data: Send + Sync;

    /// Storage type this format implements
    fn storage_type(&self) -> StorageType;

    /// Read and parse the file at `path`
    async fn read(&self, path: &Path) -> StorageResult<Self::Data>;

    /// Serialize `data` into the file at `path`, replacing its content
    async fn write(&self, path: &Path, data: &Self::Data) -> StorageResult<()>;
}
