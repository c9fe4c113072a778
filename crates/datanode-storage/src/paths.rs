//! Path computation for file-backed data nodes.
//!
//! Generated layout: `{storage_folder}/{storage_type}s/{id}.{extension}`.

use std::path::{Path, PathBuf};

use datanode_core::{DataNodeId, StorageType};
use tokio::fs;

use crate::traits::StorageResult;

/// Segment identifying paths from the legacy storage layout.
pub const LEGACY_MARKER: &str = ".data";

/// Canonical path of a data node file under `storage_folder`.
pub fn build_path(storage_folder: &Path, storage_type: StorageType, id: &DataNodeId) -> PathBuf {
    storage_folder
        .join(storage_type.folder_name())
        .join(format!("{}.{}", id, storage_type.extension()))
}

pub fn is_legacy_path(path: &str) -> bool {
    path.contains(LEGACY_MARKER)
}

/// Lexically normalize a path: `\` becomes `/`, `.` segments and redundant
/// separators are dropped, `..` folds into its parent when there is one.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

pub(crate) fn path_to_string(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

/// Ensure parent directory exists
pub async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Move a file, falling back to copy and remove when a rename is not possible
/// (e.g. across file systems).
pub async fn move_file(from: &Path, to: &Path) -> StorageResult<()> {
    ensure_parent_dir(to).await?;
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to).await?;
    fs::remove_file(from).await?;
    Ok(())
}

/// Whether both paths resolve to the same existing file.
pub async fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a).await, fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub(crate) async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
