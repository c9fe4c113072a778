//! Data node registries
//!
//! `InMemoryRegistry` keeps data nodes in a map for the lifetime of the process.
//! `FsRegistry` stores one JSON document per data node under
//! `{root}/data_nodes/{id}.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use datanode_core::{CoreError, CoreResult, DataNode, DataNodeId, DataNodeRegistry};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

const DATA_NODES_FOLDER: &str = "data_nodes";

#[derive(Default)]
pub struct InMemoryRegistry {
    nodes: RwLock<HashMap<DataNodeId, DataNode>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

#[async_trait]
impl DataNodeRegistry for InMemoryRegistry {
    async fn set(&self, node: &DataNode) -> CoreResult<()> {
        self.nodes
            .write()
            .await
            .insert(node.id.clone(), node.clone());
        Ok(())
    }

    async fn get(&self, id: &DataNodeId) -> CoreResult<Option<DataNode>> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &DataNodeId) -> CoreResult<()> {
        self.nodes.write().await.remove(id);
        Ok(())
    }
}

/// Filesystem registry
#[derive(Clone)]
pub struct FsRegistry {
    base_path: PathBuf,
}

impl FsRegistry {
    /// Create a registry rooted at `root`, creating its directory.
    pub async fn new(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let base_path = root.into().join(DATA_NODES_FOLDER);

        fs::create_dir_all(&base_path).await.map_err(|e| {
            CoreError::InvalidConfig(format!(
                "Failed to create registry directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(FsRegistry { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a data node id to its document path.
    ///
    /// Ids that would escape the registry directory are rejected.
    fn id_to_path(&self, id: &DataNodeId) -> CoreResult<PathBuf> {
        let raw = id.as_str();
        if raw.is_empty() || raw.contains("..") || raw.contains('/') || raw.contains('\\') {
            return Err(CoreError::Registry(format!("Invalid data node id: {}", raw)));
        }
        Ok(self.base_path.join(format!("{}.json", raw)))
    }
}

#[async_trait]
impl DataNodeRegistry for FsRegistry {
    async fn set(&self, node: &DataNode) -> CoreResult<()> {
        let path = self.id_to_path(&node.id)?;
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(node)?;

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, &path).await?;

        tracing::debug!(
            datanode_id = %node.id,
            path = %path.display(),
            size_bytes = bytes.len(),
            "Data node persisted"
        );

        Ok(())
    }

    async fn get(&self, id: &DataNodeId) -> CoreResult<Option<DataNode>> {
        let path = self.id_to_path(id)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let bytes = fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn delete(&self, id: &DataNodeId) -> CoreResult<()> {
        let path = self.id_to_path(id)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }
        fs::remove_file(&path).await?;
        tracing::debug!(datanode_id = %id, "Data node removed from registry");
        Ok(())
    }
}
