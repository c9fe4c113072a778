use crate::{FsRegistry, InMemoryRegistry, StorageResult};
use datanode_core::{CoreConfig, DataNodeRegistry, RegistryBackend};
use std::sync::Arc;

/// Create a data node registry based on configuration
pub async fn create_registry(config: &CoreConfig) -> StorageResult<Arc<dyn DataNodeRegistry>> {
    match config.registry_backend {
        RegistryBackend::Memory => Ok(Arc::new(InMemoryRegistry::new())),
        RegistryBackend::Filesystem => {
            let registry = FsRegistry::new(config.registry_root.clone()).await?;
            Ok(Arc::new(registry))
        }
    }
}
