//! File-backed data node
//!
//! [`FileDataNode`] owns the location of a data node file (explicit, default,
//! generated or migrated from the legacy layout), gates uploads and downloads of
//! that file, and records every write in the data node's edit history.
//!
//! Conditions a user can cause are returned as a [`ReasonCollection`]; only
//! unexpected failures (copy errors, registry errors) are returned as `Err`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use datanode_core::{
    CoreConfig, CoreError, DataNode, DataNodeId, DataNodeRegistry, Edit, EditTracking, LogLevel,
    Reason, ReasonCollection, DEFAULT_PATH_KEY, IS_GENERATED_KEY, PATH_KEY, SYSTEM_EDITOR,
};
use serde_json::{Map, Value};
use tokio::fs;

use crate::paths::{self, ensure_parent_dir, is_legacy_path, move_file, normalize_path};
use crate::traits::{FileFormat, StorageError, StorageResult};

/// Comment of the edit recorded when default data is materialized.
pub const DEFAULT_DATA_COMMENT: &str = "Default data written.";

/// Decides whether parsed upload content is acceptable.
///
/// Receives the uploaded file name and its parsed content. An `Err` counts as a
/// rejection. The checker may borrow from the caller.
pub type UploadChecker<'a, D> = dyn Fn(&str, &D) -> anyhow::Result<bool> + Send + Sync + 'a;

/// Edit information attached to a write or an upload
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    pub editor_id: Option<String>,
    pub comment: Option<String>,
    /// Extra fields stored in the edit history entry.
    pub metadata: Map<String, Value>,
}

impl EditOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_editor(mut self, editor_id: impl Into<String>) -> Self {
        self.editor_id = Some(editor_id.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn into_edit(self, timestamp: DateTime<Utc>) -> Edit {
        Edit {
            timestamp,
            editor_id: Some(self.editor_id.unwrap_or_else(|| SYSTEM_EDITOR.to_string())),
            comment: self.comment,
            metadata: self.metadata,
        }
    }
}

/// Data node whose content lives in a single file
pub struct FileDataNode<F: FileFormat> {
    node: DataNode,
    format: F,
    config: CoreConfig,
    registry: Arc<dyn DataNodeRegistry>,
    path: String,
    is_generated: bool,
}

impl<F: FileFormat> FileDataNode<F> {
    /// Resolve the file location of `node`.
    ///
    /// The `path` property wins over `default_path`. A legacy path is migrated to
    /// the generated layout; without any path one is generated. The resolved path
    /// and the `is_generated` flag are written back into the node properties.
    pub async fn new(
        node: DataNode,
        format: F,
        config: CoreConfig,
        registry: Arc<dyn DataNodeRegistry>,
    ) -> StorageResult<Self> {
        if node.storage_type != format.storage_type() {
            return Err(StorageError::StorageTypeMismatch {
                expected: node.storage_type,
                actual: format.storage_type(),
            });
        }

        let given = node
            .str_property(PATH_KEY)
            .or_else(|| node.str_property(DEFAULT_PATH_KEY))
            .map(str::to_string);
        let is_generated = node
            .bool_property(IS_GENERATED_KEY)
            .unwrap_or(given.is_none());

        let mut file_node = FileDataNode {
            node,
            format,
            config,
            registry,
            path: String::new(),
            is_generated,
        };

        file_node.path = match given {
            Some(old_path) if is_legacy_path(&old_path) => file_node.migrate_path(&old_path).await?,
            Some(path) => normalize_path(&path),
            None => file_node.build_path().await?,
        };

        let path = file_node.path.clone();
        let properties = file_node.node.properties_mut();
        properties.insert(IS_GENERATED_KEY.to_string(), Value::Bool(is_generated));
        properties.insert(PATH_KEY.to_string(), Value::String(path));

        Ok(file_node)
    }

    /// Resolve the file location, materialize `default_data` and register the
    /// data node.
    pub async fn create(
        node: DataNode,
        format: F,
        config: CoreConfig,
        registry: Arc<dyn DataNodeRegistry>,
        default_data: Option<&F::Data>,
    ) -> StorageResult<Self> {
        let mut file_node = Self::new(node, format, config, registry).await?;
        file_node.write_default_data(default_data).await?;
        file_node.persist().await?;
        Ok(file_node)
    }

    pub fn id(&self) -> &DataNodeId {
        self.node.id()
    }

    pub fn node(&self) -> &DataNode {
        &self.node
    }

    pub fn into_node(self) -> DataNode {
        self.node
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Point the data node at another file. The path is no longer generated.
    pub fn set_path(&mut self, value: &str) {
        let path = normalize_path(value);
        self.path = path.clone();
        self.is_generated = false;
        let properties = self.node.properties_mut();
        properties.insert(PATH_KEY.to_string(), Value::String(path));
        properties.insert(IS_GENERATED_KEY.to_string(), Value::Bool(false));
    }

    pub fn is_generated(&self) -> bool {
        self.is_generated
    }

    pub fn last_edit_date(&self) -> Option<DateTime<Utc>> {
        self.node.last_edit_date()
    }

    pub async fn is_downloadable(&self) -> ReasonCollection {
        let mut reasons = ReasonCollection::new();
        match fs::metadata(&self.path).await {
            Err(_) => {
                reasons.add_reason(
                    self.id().as_str(),
                    Reason::NoFileToDownload {
                        path: self.path.clone(),
                        datanode_id: self.id().clone(),
                    },
                );
            }
            Ok(meta) if !meta.is_file() => {
                reasons.add_reason(
                    self.id().as_str(),
                    Reason::NotAFile {
                        path: self.path.clone(),
                        datanode_id: self.id().clone(),
                    },
                );
            }
            Ok(_) => {}
        }
        reasons
    }

    /// Upload admissibility. Lock conflicts are checked by [`Self::upload`].
    pub fn is_uploadable(&self) -> ReasonCollection {
        ReasonCollection::new()
    }

    /// The path if it holds a regular file, otherwise an empty string.
    pub async fn downloadable_path(&self) -> String {
        if paths::is_file(Path::new(&self.path)).await {
            self.path.clone()
        } else {
            String::new()
        }
    }

    /// Replace the data node file with the file at `path`.
    ///
    /// Refused (with exactly one reason) when another editor holds an unexpired
    /// lock, when the file cannot be parsed, or when `upload_checker` rejects it
    /// or fails. On success the edit is recorded, the lock released and the data
    /// node persisted.
    pub async fn upload(
        &mut self,
        path: impl AsRef<Path>,
        upload_checker: Option<&UploadChecker<'_, F::Data>>,
        options: EditOptions,
    ) -> StorageResult<ReasonCollection> {
        let mut reasons = ReasonCollection::new();
        let id = self.id().clone();

        if let Some(editor_id) = options.editor_id.as_deref().filter(|e| !e.is_empty()) {
            if self.node.edit_lock().is_held_by_other(editor_id, Utc::now()) {
                tracing::debug!(
                    datanode_id = %id,
                    editor_id = %editor_id,
                    locked_by = ?self.node.editor_id(),
                    "Upload refused, data node is being edited"
                );
                reasons.add_reason(id.as_str(), Reason::DataNodeEditInProgress { datanode_id: id.clone() });
                return Ok(reasons);
            }
        }

        let up_path = path.as_ref();
        let file_name = up_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| up_path.display().to_string());

        let upload_data = match self.read_from_path(up_path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(
                    datanode_id = %id,
                    file_name = %file_name,
                    error = %e,
                    "Error uploading file to data node"
                );
                reasons.add_reason(
                    id.as_str(),
                    Reason::UploadFileCanNotBeRead {
                        file_name,
                        datanode_id: id.clone(),
                    },
                );
                return Ok(reasons);
            }
        };

        if let Some(checker) = upload_checker {
            let can_upload = match checker(file_name.as_str(), &upload_data) {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!(
                        datanode_id = %id,
                        file_name = %file_name,
                        error = %e,
                        "Error with the upload checker"
                    );
                    false
                }
            };

            if !can_upload {
                reasons.add_reason(
                    id.as_str(),
                    Reason::InvalidUploadFile {
                        file_name,
                        datanode_id: id.clone(),
                    },
                );
                return Ok(reasons);
            }
        }

        let start = std::time::Instant::now();
        let target = PathBuf::from(&self.path);
        if paths::is_same_file(up_path, &target).await {
            return Err(StorageError::CopyFailed(format!(
                "{} and {} are the same file",
                up_path.display(),
                target.display()
            )));
        }
        ensure_parent_dir(&target).await?;
        let size = fs::copy(up_path, &target).await.map_err(|e| {
            StorageError::CopyFailed(format!(
                "Failed to copy {} to {}: {}",
                up_path.display(),
                target.display(),
                e
            ))
        })?;

        tracing::info!(
            datanode_id = %id,
            from_path = %up_path.display(),
            to_path = %target.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload successful"
        );

        self.node.append_edit(options.into_edit(Utc::now()));
        self.node.unlock_edit();
        self.persist().await?;

        Ok(reasons)
    }

    /// Parse the file at `path` with this data node's format.
    pub async fn read_from_path(&self, path: &Path) -> StorageResult<F::Data> {
        self.format.read(path).await
    }

    /// Read the data node file; `None` when no file exists yet.
    pub async fn read(&self) -> StorageResult<Option<F::Data>> {
        let path = Path::new(&self.path);
        if !fs::try_exists(path).await.unwrap_or(false) {
            tracing::warn!(datanode_id = %self.id(), path = %self.path, "Data node file does not exist");
            return Ok(None);
        }
        self.read_from_path(path).await.map(Some)
    }

    /// Write `data` to the data node file, record the edit, release the lock and
    /// persist the data node.
    pub async fn write(&mut self, data: &F::Data, options: EditOptions) -> StorageResult<()> {
        let path = PathBuf::from(&self.path);
        ensure_parent_dir(&path).await?;
        self.format.write(&path, data).await?;

        self.node.append_edit(options.into_edit(Utc::now()));
        self.node.unlock_edit();
        self.persist().await
    }

    /// Materialize `default_value` when the data node file does not exist yet.
    ///
    /// When nothing is written but a file exists and no edit date is known, the
    /// last edit date is set to now, not to the file modification time.
    pub async fn write_default_data(&mut self, default_value: Option<&F::Data>) -> StorageResult<()> {
        let path = PathBuf::from(&self.path);

        if let Some(value) = default_value {
            if !fs::try_exists(&path).await.unwrap_or(false) {
                ensure_parent_dir(&path).await?;
                self.format.write(&path, value).await?;

                let timestamp = modified_datetime(&path).await.unwrap_or_else(Utc::now);
                self.node.append_edit(Edit {
                    timestamp,
                    editor_id: Some(SYSTEM_EDITOR.to_string()),
                    comment: Some(DEFAULT_DATA_COMMENT.to_string()),
                    metadata: Map::new(),
                });

                tracing::info!(
                    datanode_id = %self.id(),
                    path = %path.display(),
                    "Default data written"
                );
            }
        }

        if self.node.last_edit_date().is_none() && paths::is_file(&path).await {
            self.node.set_last_edit_date(Utc::now());
        }

        Ok(())
    }

    /// Lock the data node for `editor_id` for the configured lock duration.
    pub async fn lock_edit(&mut self, editor_id: Option<&str>) -> StorageResult<()> {
        if let Err(e) = self.node.lock_edit(editor_id, self.config.edit_lock_duration()) {
            log_core_error(self.id(), &e, "Failed to lock data node");
            return Err(e.into());
        }
        self.persist().await
    }

    pub async fn unlock_edit(&mut self) -> StorageResult<()> {
        self.node.unlock_edit();
        self.persist().await
    }

    async fn persist(&self) -> StorageResult<()> {
        if let Err(e) = self.registry.set(&self.node).await {
            log_core_error(self.id(), &e, "Failed to persist data node");
            return Err(e.into());
        }
        Ok(())
    }

    /// Generated path of this data node, creating its folder.
    async fn build_path(&self) -> StorageResult<String> {
        let path = paths::build_path(
            self.config.storage_folder(),
            self.node.storage_type,
            self.id(),
        );
        ensure_parent_dir(&path).await?;
        Ok(paths::path_to_string(&path))
    }

    /// Move a legacy file to the generated layout and return the new path.
    ///
    /// A missing legacy file is not an error; a failed move is logged and the
    /// generated path is adopted anyway.
    async fn migrate_path(&self, old_path: &str) -> StorageResult<String> {
        let new_path = self.build_path().await?;
        let old = Path::new(old_path);

        if fs::try_exists(old).await.unwrap_or(false) {
            match move_file(old, Path::new(&new_path)).await {
                Ok(()) => tracing::info!(
                    datanode_id = %self.id(),
                    from_path = %old_path,
                    to_path = %new_path,
                    "Migrated data node file to the generated layout"
                ),
                Err(e) => tracing::warn!(
                    datanode_id = %self.id(),
                    from_path = %old_path,
                    to_path = %new_path,
                    error = %e,
                    "Failed to migrate data node file"
                ),
            }
        }

        Ok(new_path)
    }
}

fn log_core_error(id: &DataNodeId, err: &CoreError, message: &str) {
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(datanode_id = %id, error_code = err.error_code(), error = %err, "{}", message)
        }
        LogLevel::Warn => {
            tracing::warn!(datanode_id = %id, error_code = err.error_code(), error = %err, "{}", message)
        }
        LogLevel::Error => {
            tracing::error!(datanode_id = %id, error_code = err.error_code(), error = %err, "{}", message)
        }
    }
}

async fn modified_datetime(path: &Path) -> Option<DateTime<Utc>> {
    let meta = fs::metadata(path).await.ok()?;
    meta.modified().ok().map(DateTime::<Utc>::from)
}

#[cfg(all(test, feature = "format-csv", feature = "format-json"))]
mod tests {
    use super::*;
    use crate::csv::{CsvFormat, CsvTable};
    use crate::json::JsonFormat;
    use crate::registry::InMemoryRegistry;
    use chrono::Duration;
    use datanode_core::{Properties, StorageType};
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        dir: TempDir,
        config: CoreConfig,
        registry: Arc<InMemoryRegistry>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let config = CoreConfig::new(dir.path().join("storage"));
            Fixture {
                dir,
                config,
                registry: Arc::new(InMemoryRegistry::new()),
            }
        }

        fn csv_node(&self, id: &str, properties: Properties) -> DataNode {
            DataNode::with_id(DataNodeId::from(id), "cfg", StorageType::Csv, properties)
        }

        async fn csv(&self, id: &str, properties: Properties) -> FileDataNode<CsvFormat> {
            FileDataNode::new(
                self.csv_node(id, properties),
                CsvFormat::new(),
                self.config.clone(),
                self.registry.clone(),
            )
            .await
            .unwrap()
        }

        async fn source_file(&self, name: &str, content: &[u8]) -> PathBuf {
            let path = self.dir.path().join("uploads").join(name);
            fs::create_dir_all(path.parent().unwrap()).await.unwrap();
            fs::write(&path, content).await.unwrap();
            path
        }
    }

    fn props(pairs: &[(&str, Value)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_generated_path_layout() {
        let fx = Fixture::new();
        let dn = fx.csv("dn1", Properties::new()).await;

        let expected = fx.config.storage_folder().join("csvs").join("dn1.csv");
        assert_eq!(dn.path(), paths::path_to_string(&expected));
        assert!(dn.is_generated());
        assert!(expected.parent().unwrap().is_dir());
        assert_eq!(dn.node().properties[PATH_KEY], json!(dn.path()));
        assert_eq!(dn.node().properties[IS_GENERATED_KEY], json!(true));
    }

    #[tokio::test]
    async fn test_generated_path_with_absolute_root() {
        let registry = Arc::new(InMemoryRegistry::new());
        let node = DataNode::with_id(DataNodeId::from("dn1"), "cfg", StorageType::Csv, Properties::new());
        let dir = tempdir().unwrap();
        let root = dir.path().join("data");
        let dn = FileDataNode::new(node, CsvFormat::new(), CoreConfig::new(&root), registry)
            .await
            .unwrap();

        assert_eq!(dn.path(), format!("{}/csvs/dn1.csv", normalize_path(&root.to_string_lossy())));
    }

    #[tokio::test]
    async fn test_explicit_path_wins_over_default_path() {
        let fx = Fixture::new();
        let dn = fx
            .csv(
                "dn1",
                props(&[
                    (PATH_KEY, json!("a/./b.csv")),
                    (DEFAULT_PATH_KEY, json!("c.csv")),
                ]),
            )
            .await;

        assert_eq!(dn.path(), "a/b.csv");
        assert!(!dn.is_generated());
    }

    #[tokio::test]
    async fn test_default_path_is_used() {
        let fx = Fixture::new();
        let dn = fx.csv("dn1", props(&[(DEFAULT_PATH_KEY, json!("pa/th"))])).await;
        assert_eq!(dn.path(), "pa/th");
        assert!(!dn.is_generated());
    }

    #[tokio::test]
    async fn test_is_generated_property_is_kept() {
        let fx = Fixture::new();
        let dn = fx
            .csv(
                "dn1",
                props(&[(PATH_KEY, json!("x.csv")), (IS_GENERATED_KEY, json!(true))]),
            )
            .await;
        assert!(dn.is_generated());
    }

    #[tokio::test]
    async fn test_legacy_path_is_migrated() {
        let fx = Fixture::new();
        let legacy = fx.dir.path().join(".data").join("dn1.csv");
        fs::create_dir_all(legacy.parent().unwrap()).await.unwrap();
        fs::write(&legacy, b"a\n1\n").await.unwrap();

        let dn = fx
            .csv("dn1", props(&[(PATH_KEY, json!(legacy.to_string_lossy()))]))
            .await;

        let expected = fx.config.storage_folder().join("csvs").join("dn1.csv");
        assert_eq!(dn.path(), paths::path_to_string(&expected));
        assert!(!legacy.exists());
        assert_eq!(fs::read(&expected).await.unwrap(), b"a\n1\n");
    }

    #[tokio::test]
    async fn test_missing_legacy_file_still_adopts_generated_path() {
        let fx = Fixture::new();
        let dn = fx.csv("dn1", props(&[(PATH_KEY, json!(".data/dn1.csv"))])).await;

        let expected = fx.config.storage_folder().join("csvs").join("dn1.csv");
        assert_eq!(dn.path(), paths::path_to_string(&expected));
        assert!(!expected.exists());
    }

    #[tokio::test]
    async fn test_storage_type_mismatch_is_rejected() {
        let fx = Fixture::new();
        let result = FileDataNode::new(
            fx.csv_node("dn1", Properties::new()),
            JsonFormat::new(),
            fx.config.clone(),
            fx.registry.clone(),
        )
        .await;
        assert!(matches!(result, Err(StorageError::StorageTypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_set_path_clears_generated_flag() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        assert!(dn.is_generated());

        dn.set_path("foo\\bar.csv");

        assert_eq!(dn.path(), "foo/bar.csv");
        assert!(!dn.is_generated());
        assert_eq!(dn.node().properties[PATH_KEY], json!("foo/bar.csv"));
        assert_eq!(dn.node().properties[IS_GENERATED_KEY], json!(false));
    }

    #[tokio::test]
    async fn test_is_downloadable() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;

        let reasons = dn.is_downloadable().await;
        assert_eq!(reasons.len(), 1);
        assert!(matches!(reasons.reasons_for("dn1")[0], Reason::NoFileToDownload { .. }));
        assert_eq!(dn.downloadable_path().await, "");

        dn.set_path(&fx.dir.path().to_string_lossy());
        let reasons = dn.is_downloadable().await;
        assert_eq!(reasons.len(), 1);
        assert!(matches!(reasons.reasons_for("dn1")[0], Reason::NotAFile { .. }));
        assert_eq!(dn.downloadable_path().await, "");

        let file = fx.source_file("in.csv", b"a\n1\n").await;
        dn.set_path(&file.to_string_lossy());
        assert!(dn.is_downloadable().await.is_allowed());
        assert_eq!(dn.downloadable_path().await, dn.path());
    }

    #[tokio::test]
    async fn test_is_uploadable_is_always_allowed() {
        let fx = Fixture::new();
        let dn = fx.csv("dn1", Properties::new()).await;
        assert!(dn.is_uploadable().is_allowed());
    }

    #[tokio::test]
    async fn test_upload_success() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        let source = fx.source_file("in.csv", b"name,qty\napple,3\n").await;

        let reasons = dn
            .upload(
                &source,
                None,
                EditOptions::new()
                    .with_editor("alice")
                    .with_comment("monthly refresh")
                    .with_metadata("job_id", "job-1"),
            )
            .await
            .unwrap();

        assert!(reasons.is_allowed());
        assert_eq!(fs::read(dn.path()).await.unwrap(), b"name,qty\napple,3\n");
        let edits = &dn.node().edits;
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].editor_id.as_deref(), Some("alice"));
        assert_eq!(edits[0].comment.as_deref(), Some("monthly refresh"));
        assert_eq!(edits[0].metadata["job_id"], json!("job-1"));
        assert_eq!(dn.last_edit_date(), Some(edits[0].timestamp));

        let stored = fx.registry.get(dn.id()).await.unwrap().unwrap();
        assert_eq!(stored.edits.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_without_editor_is_attributed_to_system() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        let source = fx.source_file("in.csv", b"a\n1\n").await;

        let reasons = dn.upload(&source, None, EditOptions::new()).await.unwrap();

        assert!(reasons.is_allowed());
        assert_eq!(dn.node().edits[0].editor_id.as_deref(), Some(SYSTEM_EDITOR));
    }

    #[tokio::test]
    async fn test_upload_refused_while_other_editor_holds_lock() {
        let fx = Fixture::new();
        let mut node = fx.csv_node("dn1", Properties::new());
        node.lock_edit(Some("bob"), Duration::minutes(30)).unwrap();
        node.edit_lock.editor_expiration_date = None;
        let mut dn = FileDataNode::new(node, CsvFormat::new(), fx.config.clone(), fx.registry.clone())
            .await
            .unwrap();
        let source = fx.source_file("in.csv", b"a\n1\n").await;

        let reasons = dn
            .upload(&source, None, EditOptions::new().with_editor("alice"))
            .await
            .unwrap();

        assert_eq!(reasons.len(), 1);
        assert!(matches!(
            reasons.reasons_for("dn1")[0],
            Reason::DataNodeEditInProgress { .. }
        ));
        assert!(!Path::new(dn.path()).exists());
        assert!(dn.node().edits.is_empty());
        assert!(dn.node().edit_in_progress());
    }

    #[tokio::test]
    async fn test_upload_allowed_for_lock_owner_and_releases_lock() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        dn.lock_edit(Some("alice")).await.unwrap();
        let source = fx.source_file("in.csv", b"a\n1\n").await;

        let reasons = dn
            .upload(&source, None, EditOptions::new().with_editor("alice"))
            .await
            .unwrap();

        assert!(reasons.is_allowed());
        assert!(!dn.node().edit_in_progress());
        assert!(dn.node().editor_id().is_none());
    }

    #[tokio::test]
    async fn test_upload_allowed_when_lock_expired() {
        let fx = Fixture::new();
        let mut node = fx.csv_node("dn1", Properties::new());
        node.lock_edit(Some("bob"), Duration::minutes(30)).unwrap();
        node.edit_lock.editor_expiration_date = Some(Utc::now() - Duration::minutes(1));
        let mut dn = FileDataNode::new(node, CsvFormat::new(), fx.config.clone(), fx.registry.clone())
            .await
            .unwrap();
        let source = fx.source_file("in.csv", b"a\n1\n").await;

        let reasons = dn
            .upload(&source, None, EditOptions::new().with_editor("alice"))
            .await
            .unwrap();

        assert!(reasons.is_allowed());
        assert_eq!(dn.node().edits.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_with_empty_editor_skips_lock_check() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        dn.lock_edit(Some("bob")).await.unwrap();
        let source = fx.source_file("in.csv", b"a\n1\n").await;

        let reasons = dn
            .upload(&source, None, EditOptions::new().with_editor(""))
            .await
            .unwrap();

        assert!(reasons.is_allowed());
        assert_eq!(dn.node().edits.len(), 1);
        assert!(!dn.node().edit_in_progress());
    }

    #[tokio::test]
    async fn test_upload_own_file_keeps_content() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        fs::write(dn.path(), b"a,b\n1,2\n").await.unwrap();
        let own_path = PathBuf::from(dn.path());

        let result = dn.upload(&own_path, None, EditOptions::new()).await;

        assert!(matches!(result, Err(StorageError::CopyFailed(_))));
        assert_eq!(fs::read(dn.path()).await.unwrap(), b"a,b\n1,2\n");
        assert!(dn.node().edits.is_empty());
        assert!(fx.registry.get(dn.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_checker_borrows_required_columns() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        let source = fx.source_file("in.csv", b"name,qty\napple,3\n").await;
        let required = vec!["name".to_string(), "qty".to_string()];
        let checker = |_: &str, table: &CsvTable| -> anyhow::Result<bool> {
            Ok(required.iter().all(|col| table.column_index(col).is_some()))
        };

        let reasons = dn
            .upload(&source, Some(&checker), EditOptions::new())
            .await
            .unwrap();

        assert!(reasons.is_allowed());
        assert_eq!(required.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_unreadable_file() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        let source = fx.source_file("bad.csv", b"a,b\n1,2,3\n").await;
        let checker_called = std::sync::atomic::AtomicBool::new(false);
        let checker = |_: &str, _: &CsvTable| -> anyhow::Result<bool> {
            checker_called.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(true)
        };

        let reasons = dn
            .upload(&source, Some(&checker), EditOptions::new())
            .await
            .unwrap();

        assert_eq!(reasons.len(), 1);
        assert_eq!(
            reasons.reasons_for("dn1")[0],
            Reason::UploadFileCanNotBeRead {
                file_name: "bad.csv".to_string(),
                datanode_id: DataNodeId::from("dn1"),
            }
        );
        assert!(!checker_called.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!Path::new(dn.path()).exists());
        assert!(dn.node().edits.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejected_by_checker() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        let source = fx.source_file("in.csv", b"name\napple\n").await;
        let checker = |name: &str, table: &CsvTable| -> anyhow::Result<bool> {
            Ok(name == "in.csv" && table.column_index("qty").is_some())
        };

        let reasons = dn
            .upload(&source, Some(&checker), EditOptions::new())
            .await
            .unwrap();

        assert_eq!(reasons.len(), 1);
        assert!(matches!(reasons.reasons_for("dn1")[0], Reason::InvalidUploadFile { .. }));
        assert!(!Path::new(dn.path()).exists());
        assert!(dn.node().edits.is_empty());
    }

    #[tokio::test]
    async fn test_failing_checker_counts_as_rejection() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        let source = fx.source_file("in.csv", b"a\n1\n").await;
        let checker = |_: &str, _: &CsvTable| -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("Failed"))
        };

        let reasons = dn
            .upload(&source, Some(&checker), EditOptions::new())
            .await
            .unwrap();

        assert_eq!(reasons.len(), 1);
        assert!(matches!(reasons.reasons_for("dn1")[0], Reason::InvalidUploadFile { .. }));
        assert!(!Path::new(dn.path()).exists());
    }

    #[tokio::test]
    async fn test_upload_accepted_by_checker() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        let source = fx.source_file("in.csv", b"name,qty\napple,3\n").await;
        let checker = |_: &str, table: &CsvTable| -> anyhow::Result<bool> { Ok(!table.is_empty()) };

        let reasons = dn
            .upload(&source, Some(&checker), EditOptions::new())
            .await
            .unwrap();

        assert!(reasons.is_allowed());
        assert_eq!(dn.read().await.unwrap().unwrap().rows.len(), 1);
    }

    #[tokio::test]
    async fn test_write_default_data_once() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        let default = CsvTable::new(vec!["a".to_string()], vec![vec!["1".to_string()]]);

        dn.write_default_data(Some(&default)).await.unwrap();

        assert_eq!(dn.read().await.unwrap(), Some(default.clone()));
        assert_eq!(dn.node().edits.len(), 1);
        let edit = &dn.node().edits[0];
        assert_eq!(edit.editor_id.as_deref(), Some(SYSTEM_EDITOR));
        assert_eq!(edit.comment.as_deref(), Some(DEFAULT_DATA_COMMENT));
        assert_eq!(dn.last_edit_date(), Some(edit.timestamp));

        let other = CsvTable::new(vec!["b".to_string()], vec![vec!["2".to_string()]]);
        dn.write_default_data(Some(&other)).await.unwrap();

        assert_eq!(dn.read().await.unwrap(), Some(default));
        assert_eq!(dn.node().edits.len(), 1);
    }

    #[tokio::test]
    async fn test_write_default_data_backfills_last_edit_date() {
        let fx = Fixture::new();
        let file = fx.source_file("existing.csv", b"a\n1\n").await;
        let mut dn = fx
            .csv("dn1", props(&[(PATH_KEY, json!(file.to_string_lossy()))]))
            .await;
        assert!(dn.last_edit_date().is_none());

        let before = Utc::now();
        dn.write_default_data(None).await.unwrap();

        assert!(dn.last_edit_date().unwrap() >= before);
        assert!(dn.node().edits.is_empty());
    }

    #[tokio::test]
    async fn test_write_default_data_without_value_or_file() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;

        dn.write_default_data(None).await.unwrap();

        assert!(dn.last_edit_date().is_none());
        assert!(dn.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_registers_node_with_default_data() {
        let fx = Fixture::new();
        let node = DataNode::with_id(DataNodeId::from("cfg1"), "cfg", StorageType::Json, Properties::new());
        let default = json!({"threshold": 3});

        let dn = FileDataNode::create(
            node,
            JsonFormat::new(),
            fx.config.clone(),
            fx.registry.clone(),
            Some(&default),
        )
        .await
        .unwrap();

        assert_eq!(dn.read().await.unwrap(), Some(default));
        let stored = fx.registry.get(dn.id()).await.unwrap().unwrap();
        assert_eq!(stored.properties[PATH_KEY], json!(dn.path()));
        assert_eq!(stored.edits.len(), 1);
    }

    #[tokio::test]
    async fn test_write_tracks_edit_and_persists() {
        let fx = Fixture::new();
        let node = DataNode::with_id(DataNodeId::from("j1"), "cfg", StorageType::Json, Properties::new());
        let mut dn = FileDataNode::new(node, JsonFormat::new(), fx.config.clone(), fx.registry.clone())
            .await
            .unwrap();
        dn.lock_edit(Some("alice")).await.unwrap();

        dn.write(&json!([1, 2]), EditOptions::new().with_editor("alice"))
            .await
            .unwrap();

        assert_eq!(dn.read().await.unwrap(), Some(json!([1, 2])));
        assert!(!dn.node().edit_in_progress());
        let stored = fx.registry.get(dn.id()).await.unwrap().unwrap();
        assert_eq!(stored.edits.len(), 1);
        assert!(!stored.edit_lock.edit_in_progress);
    }

    #[tokio::test]
    async fn test_lock_edit_conflict_surfaces_as_error() {
        let fx = Fixture::new();
        let mut dn = fx.csv("dn1", Properties::new()).await;
        dn.lock_edit(Some("bob")).await.unwrap();

        let result = dn.lock_edit(Some("alice")).await;
        assert!(matches!(
            result,
            Err(StorageError::Core(datanode_core::CoreError::DataNodeIsBeingEdited { .. }))
        ));

        dn.unlock_edit().await.unwrap();
        dn.lock_edit(Some("alice")).await.unwrap();
        let stored = fx.registry.get(dn.id()).await.unwrap().unwrap();
        assert_eq!(stored.edit_lock.editor_id.as_deref(), Some("alice"));
    }
}
