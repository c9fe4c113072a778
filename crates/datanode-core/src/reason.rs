//! Reasons explaining why an operation on an entity is not allowed.
//!
//! Reasons are returned, never raised: callers inspect the collection and show
//! the messages to the user.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::models::DataNodeId;

/// Why an operation was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    NoFileToDownload {
        path: String,
        datanode_id: DataNodeId,
    },
    NotAFile {
        path: String,
        datanode_id: DataNodeId,
    },
    DataNodeEditInProgress {
        datanode_id: DataNodeId,
    },
    UploadFileCanNotBeRead {
        file_name: String,
        datanode_id: DataNodeId,
    },
    InvalidUploadFile {
        file_name: String,
        datanode_id: DataNodeId,
    },
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Reason::NoFileToDownload { path, datanode_id } => write!(
                f,
                "Path '{}' from data node '{}' does not exist and cannot be downloaded",
                path, datanode_id
            ),
            Reason::NotAFile { path, datanode_id } => write!(
                f,
                "Path '{}' from data node '{}' is not a file and cannot be downloaded",
                path, datanode_id
            ),
            Reason::DataNodeEditInProgress { datanode_id } => {
                write!(f, "Data node {} is being edited", datanode_id)
            }
            Reason::UploadFileCanNotBeRead {
                file_name,
                datanode_id,
            } => write!(
                f,
                "The uploaded file {} can not be read, therefore is not a valid data file for data node \"{}\"",
                file_name, datanode_id
            ),
            Reason::InvalidUploadFile {
                file_name,
                datanode_id,
            } => write!(
                f,
                "The uploaded file {} has invalid data, therefore is not a valid data file for data node \"{}\"",
                file_name, datanode_id
            ),
        }
    }
}

/// Reasons grouped by the id of the entity they apply to
///
/// An empty collection means the operation is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasonCollection {
    entries: Vec<(String, Vec<Reason>)>,
}

impl ReasonCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reason(&mut self, entity_id: impl Into<String>, reason: Reason) -> &mut Self {
        let entity_id = entity_id.into();
        match self.entries.iter_mut().find(|(id, _)| *id == entity_id) {
            Some((_, reasons)) => reasons.push(reason),
            None => self.entries.push((entity_id, vec![reason])),
        }
        self
    }

    /// True when no reason was collected.
    pub fn is_allowed(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of reasons across all entities.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, reasons)| reasons.len()).sum()
    }

    pub fn reasons_for(&self, entity_id: &str) -> &[Reason] {
        self.entries
            .iter()
            .find(|(id, _)| id == entity_id)
            .map(|(_, reasons)| reasons.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Reason)> {
        self.entries
            .iter()
            .flat_map(|(id, reasons)| reasons.iter().map(move |r| (id.as_str(), r)))
    }
}

impl Display for ReasonCollection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let messages: Vec<String> = self.iter().map(|(_, r)| r.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}
