//! Data Node Core Library
//!
//! This crate provides the domain models, reasons, error types, configuration and
//! collaborator traits shared by the data node storage components.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod reason;
pub mod storage_types;

// Re-export commonly used types
pub use config::{CoreConfig, RegistryBackend};
pub use error::{CoreError, CoreResult, LogLevel};
pub use hooks::{DataNodeRegistry, EditTracking};
pub use models::{
    DataNode, DataNodeId, Edit, EditLock, Properties, DEFAULT_PATH_KEY, IS_GENERATED_KEY,
    PATH_KEY, SYSTEM_EDITOR,
};
pub use reason::{Reason, ReasonCollection};
pub use storage_types::StorageType;
