//! Configuration module
//!
//! Settings consulted when resolving data node paths, locking data nodes for
//! edition and persisting their state.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Duration;

const STORAGE_FOLDER: &str = "user_data/";
const EDIT_LOCK_MINUTES: i64 = 30;
const REGISTRY_FOLDER: &str = ".registry";

/// Where data node state is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryBackend {
    Memory,
    Filesystem,
}

impl FromStr for RegistryBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(RegistryBackend::Memory),
            "filesystem" | "fs" => Ok(RegistryBackend::Filesystem),
            _ => Err(anyhow::anyhow!("Invalid registry backend: {}", s)),
        }
    }
}

impl Display for RegistryBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RegistryBackend::Memory => write!(f, "memory"),
            RegistryBackend::Filesystem => write!(f, "filesystem"),
        }
    }
}

/// Core configuration
#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// Base directory under which generated data node files are placed.
    pub storage_folder: PathBuf,
    /// How long an editor keeps a data node locked before the lock expires.
    pub edit_lock_minutes: i64,
    pub registry_backend: RegistryBackend,
    /// Directory used by the filesystem registry.
    pub registry_root: PathBuf,
}

impl CoreConfig {
    /// Configuration rooted at `storage_folder`, with defaults elsewhere.
    pub fn new(storage_folder: impl Into<PathBuf>) -> Self {
        let storage_folder = storage_folder.into();
        let registry_root = storage_folder.join(REGISTRY_FOLDER);
        CoreConfig {
            storage_folder,
            edit_lock_minutes: EDIT_LOCK_MINUTES,
            registry_backend: RegistryBackend::Filesystem,
            registry_root,
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_folder = PathBuf::from(
            env::var("DATANODE_STORAGE_FOLDER").unwrap_or_else(|_| STORAGE_FOLDER.to_string()),
        );

        let edit_lock_minutes = env::var("DATANODE_EDIT_LOCK_MINUTES")
            .unwrap_or_else(|_| EDIT_LOCK_MINUTES.to_string())
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("DATANODE_EDIT_LOCK_MINUTES must be a valid number"))?;

        let registry_backend = env::var("DATANODE_REGISTRY_BACKEND")
            .ok()
            .map(|s| s.parse::<RegistryBackend>())
            .transpose()?
            .unwrap_or(RegistryBackend::Filesystem);

        let registry_root = env::var("DATANODE_REGISTRY_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| storage_folder.join(REGISTRY_FOLDER));

        let config = CoreConfig {
            storage_folder,
            edit_lock_minutes,
            registry_backend,
            registry_root,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_folder.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Storage folder cannot be empty"));
        }
        if self.edit_lock_minutes <= 0 {
            return Err(anyhow::anyhow!(
                "Edit lock duration must be positive, got {} minutes",
                self.edit_lock_minutes
            ));
        }
        Ok(())
    }

    pub fn storage_folder(&self) -> &Path {
        &self.storage_folder
    }

    pub fn edit_lock_duration(&self) -> Duration {
        Duration::minutes(self.edit_lock_minutes)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig::new(STORAGE_FOLDER)
    }
}
