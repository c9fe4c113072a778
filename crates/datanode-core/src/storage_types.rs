use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::CoreError;

/// Storage types a file-backed data node can use
///
/// Each storage type owns a fixed file extension and a subfolder name under the
/// configured storage folder. Storage types without a format implementation still
/// resolve paths, so nodes configured with them keep a stable location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Csv,
    Excel,
    Parquet,
    Pickle,
    Json,
}

impl StorageType {
    /// File extension used for generated paths.
    pub fn extension(&self) -> &'static str {
        match self {
            StorageType::Csv => "csv",
            StorageType::Excel => "xlsx",
            StorageType::Parquet => "parquet",
            StorageType::Pickle => "p",
            StorageType::Json => "json",
        }
    }

    /// Subfolder holding generated files of this type, e.g. `csvs`.
    pub fn folder_name(&self) -> String {
        format!("{}s", self)
    }
}

impl FromStr for StorageType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(StorageType::Csv),
            "excel" => Ok(StorageType::Excel),
            "parquet" => Ok(StorageType::Parquet),
            "pickle" => Ok(StorageType::Pickle),
            "json" => Ok(StorageType::Json),
            _ => Err(CoreError::UnknownStorageType(s.to_string())),
        }
    }
}

impl Display for StorageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageType::Csv => write!(f, "csv"),
            StorageType::Excel => write!(f, "excel"),
            StorageType::Parquet => write!(f, "parquet"),
            StorageType::Pickle => write!(f, "pickle"),
            StorageType::Json => write!(f, "json"),
        }
    }
}
