//! Data node model: a logical, identified unit of persisted data.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::edit::{Edit, EditLock};
use crate::storage_types::StorageType;

pub const PATH_KEY: &str = "path";
pub const DEFAULT_PATH_KEY: &str = "default_path";
pub const IS_GENERATED_KEY: &str = "is_generated";

/// Free-form properties of a data node
pub type Properties = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataNodeId(String);

impl DataNodeId {
    /// Generate a fresh id of the form `DATANODE_<config_id>_<uuid>`.
    pub fn generate(config_id: &str) -> Self {
        DataNodeId(format!("DATANODE_{}_{}", config_id, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DataNodeId {
    fn from(s: &str) -> Self {
        DataNodeId(s.to_string())
    }
}

impl From<String> for DataNodeId {
    fn from(s: String) -> Self {
        DataNodeId(s)
    }
}

impl Display for DataNodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Data node entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataNode {
    pub id: DataNodeId,
    pub config_id: String,
    pub storage_type: StorageType,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub edits: Vec<Edit>,
    #[serde(default)]
    pub last_edit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub edit_lock: EditLock,
}

impl DataNode {
    /// Create a data node with a generated id.
    pub fn new(config_id: &str, storage_type: StorageType, properties: Properties) -> Self {
        Self::with_id(DataNodeId::generate(config_id), config_id, storage_type, properties)
    }

    pub fn with_id(
        id: DataNodeId,
        config_id: &str,
        storage_type: StorageType,
        properties: Properties,
    ) -> Self {
        DataNode {
            id,
            config_id: config_id.to_string(),
            storage_type,
            properties,
            edits: Vec::new(),
            last_edit_date: None,
            edit_lock: EditLock::default(),
        }
    }

    /// Read a string property, ignoring non-string and empty values.
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn bool_property(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(Value::as_bool)
    }

    pub fn edit_in_progress(&self) -> bool {
        self.edit_lock.edit_in_progress
    }

    pub fn editor_id(&self) -> Option<&str> {
        self.edit_lock.editor_id.as_deref()
    }

    pub fn editor_expiration_date(&self) -> Option<DateTime<Utc>> {
        self.edit_lock.editor_expiration_date
    }

    /// Lock the data node for edition.
    ///
    /// Fails when another editor holds an unexpired lock. A lock taken without
    /// editor id has no expiration date.
    pub fn lock_edit(&mut self, editor_id: Option<&str>, lock_duration: Duration) -> CoreResult<()> {
        let now = Utc::now();
        if let Some(editor) = editor_id {
            if self.edit_lock.is_held_by_other(editor, now) {
                return Err(CoreError::DataNodeIsBeingEdited {
                    datanode_id: self.id.clone(),
                    editor_id: self.edit_lock.editor_id.clone().unwrap_or_default(),
                });
            }
        }

        self.edit_lock = EditLock {
            edit_in_progress: true,
            editor_id: editor_id.map(str::to_string),
            editor_expiration_date: editor_id.map(|_| now + lock_duration),
        };
        Ok(())
    }

    pub fn unlock_edit(&mut self) {
        self.edit_lock.release();
    }

    /// Append an edit and move the last edit date to its timestamp.
    pub fn track_edit(&mut self, edit: Edit) {
        self.last_edit_date = Some(edit.timestamp);
        self.edits.push(edit);
    }
}
