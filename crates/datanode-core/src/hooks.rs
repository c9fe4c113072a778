//! Collaborator traits
//!
//! File-backed components reach the host record and the registry only through
//! these traits. `EditTracking` is the capability set a host record exposes
//! (lock state, edit history, properties) and `DataNodeRegistry` persists a
//! data node after it was mutated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::models::{DataNode, DataNodeId, Edit, EditLock, Properties};

/// Capabilities a host record offers to file-backed components
pub trait EditTracking {
    fn id(&self) -> &DataNodeId;

    fn edit_lock(&self) -> &EditLock;

    /// Append an edit to the history.
    fn append_edit(&mut self, edit: Edit);

    /// Release the edit lock.
    fn unlock_edit(&mut self);

    fn last_edit_date(&self) -> Option<DateTime<Utc>>;

    fn set_last_edit_date(&mut self, date: DateTime<Utc>);

    fn properties(&self) -> &Properties;

    fn properties_mut(&mut self) -> &mut Properties;
}

impl EditTracking for DataNode {
    fn id(&self) -> &DataNodeId {
        &self.id
    }

    fn edit_lock(&self) -> &EditLock {
        &self.edit_lock
    }

    fn append_edit(&mut self, edit: Edit) {
        self.track_edit(edit);
    }

    fn unlock_edit(&mut self) {
        DataNode::unlock_edit(self);
    }

    fn last_edit_date(&self) -> Option<DateTime<Utc>> {
        self.last_edit_date
    }

    fn set_last_edit_date(&mut self, date: DateTime<Utc>) {
        self.last_edit_date = Some(date);
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }
}

/// Persistence for data node state
#[async_trait]
pub trait DataNodeRegistry: Send + Sync {
    /// Store the data node, replacing any previous state with the same id.
    async fn set(&self, node: &DataNode) -> CoreResult<()>;

    async fn get(&self, id: &DataNodeId) -> CoreResult<Option<DataNode>>;

    /// Remove the data node. Removing an unknown id is not an error.
    async fn delete(&self, id: &DataNodeId) -> CoreResult<()>;
}
