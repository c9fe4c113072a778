use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Editor recorded for edits made by the system itself (default data, uploads
/// without an editor).
pub const SYSTEM_EDITOR: &str = "system";

/// Entry of a data node's edit history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Extra fields supplied by the caller.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Edit {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Edit {
            timestamp,
            editor_id: None,
            comment: None,
            metadata: Map::new(),
        }
    }

    pub fn with_editor(mut self, editor_id: impl Into<String>) -> Self {
        self.editor_id = Some(editor_id.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata.extend(metadata);
        self
    }
}

/// Advisory edit lock
///
/// The lock is only consulted, never enforced atomically: two editors racing past
/// the check can both write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLock {
    pub edit_in_progress: bool,
    pub editor_id: Option<String>,
    pub editor_expiration_date: Option<DateTime<Utc>>,
}

impl EditLock {
    /// True if another editor holds an unexpired lock.
    ///
    /// A lock without expiration date never expires.
    pub fn is_held_by_other(&self, editor_id: &str, now: DateTime<Utc>) -> bool {
        self.edit_in_progress
            && self.editor_id.as_deref() != Some(editor_id)
            && self.editor_expiration_date.map_or(true, |exp| exp > now)
    }

    pub fn release(&mut self) {
        self.edit_in_progress = false;
        self.editor_id = None;
        self.editor_expiration_date = None;
    }
}
