use std::path::PathBuf;

use datanode_core::{CoreConfig, RegistryBackend};
use tempfile::TempDir;

/// Test storage configuration.
pub struct TestStorage {
    pub temp_dir: TempDir,
    pub storage_folder: PathBuf,
    pub uploads: PathBuf,
}

impl TestStorage {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_folder = temp_dir.path().join("user_data");
        let uploads = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).expect("Failed to create uploads directory");
        Self {
            temp_dir,
            storage_folder,
            uploads,
        }
    }

    pub fn config(&self) -> CoreConfig {
        CoreConfig::new(&self.storage_folder)
    }

    pub fn memory_config(&self) -> CoreConfig {
        let mut config = self.config();
        config.registry_backend = RegistryBackend::Memory;
        config
    }

    /// Write a file a client would upload and return its path.
    pub fn upload_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.uploads.join(name);
        std::fs::write(&path, content).expect("Failed to write upload file");
        path
    }
}

impl Default for TestStorage {
    fn default() -> Self {
        Self::new()
    }
}
