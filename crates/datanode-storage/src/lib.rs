//! Data Node Storage Library
//!
//! This crate manages data nodes backed by a single file: where the file lives,
//! how it is read and written, and guarded upload / download of its content.
//!
//! # Path layout
//!
//! A data node created without `path` or `default_path` property gets a generated
//! path `{storage_folder}/{storage_type}s/{id}.{extension}`. Paths from the legacy
//! layout (containing `.data`) are migrated to the generated layout once, when the
//! node is loaded. Path computation is centralized in the `paths` module.

pub mod factory;
pub mod file_node;
#[cfg(feature = "format-csv")]
pub mod csv;
#[cfg(feature = "format-json")]
pub mod json;
pub mod paths;
pub mod registry;
pub mod traits;

// Re-export commonly used types
pub use datanode_core::StorageType;
pub use factory::create_registry;
pub use file_node::{EditOptions, FileDataNode, UploadChecker, DEFAULT_DATA_COMMENT};
#[cfg(feature = "format-csv")]
pub use self::csv::{CsvFormat, CsvTable};
#[cfg(feature = "format-json")]
pub use json::JsonFormat;
pub use registry::{FsRegistry, InMemoryRegistry};
pub use traits::{FileFormat, StorageError, StorageResult};
