use std::path::Path;

use async_trait::async_trait;
use datanode_core::StorageType;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{FileFormat, StorageError, StorageResult};

/// JSON storage format
#[derive(Debug, Clone, Default)]
pub struct JsonFormat {
    /// Indent written documents.
    pub pretty: bool,
}

impl JsonFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        JsonFormat { pretty: true }
    }
}

#[async_trait]
impl FileFormat for JsonFormat {
    type Data = Value;

    fn storage_type(&self) -> StorageType {
        StorageType::Json
    }

    async fn read(&self, path: &Path) -> StorageResult<Value> {
        let bytes = fs::read(path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::ReadFailed(format!("Invalid JSON in {}: {}", path.display(), e))
        })
    }

    async fn write(&self, path: &Path, data: &Value) -> StorageResult<()> {
        let start = std::time::Instant::now();

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(data)
        } else {
            serde_json::to_vec(data)
        }
        .map_err(|e| {
            StorageError::WriteFailed(format!("Failed to encode JSON for {}: {}", path.display(), e))
        })?;

        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        file.write_all(&bytes).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "JSON write successful"
        );

        Ok(())
    }
}
