// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! File-backed [`EntityStore`].
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<collection>/records/<id>.json        one record per file
//! <root>/<collection>/files/<id>/<filename>    attachments of that record
//! ```
//!
//! Records and attachments live in disjoint subtrees, so no id's record file
//! can coincide with another id's attachment directory.
//!
//! Every path is built from segments that passed
//! [`PathSanitizer::validate_segment`], then resolved through the filesystem
//! and checked against both the resolved storage root and the resolved parent
//! it must live in. All of that happens before the first mutating call, so a
//! rejected identifier leaves the tree untouched.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::path_sanitizer::PathSanitizer;
use crate::domain::record::{
    format_timestamp, merge_patch, next_timestamp, ListQuery, Record, CREATED_AT_FIELD, ID_FIELD,
    UPDATED_AT_FIELD,
};
use crate::domain::repository::{EntityStore, RepositoryError};
use crate::domain::storage::{FileSystem, StorageError};
use crate::infrastructure::storage::{InMemoryFileSystem, LocalFileSystem};

const RECORD_EXTENSION: &str = ".json";
const RECORDS_DIR: &str = "records";
const FILES_DIR: &str = "files";

fn count_operation(collection: &str, operation: &'static str) {
    metrics::counter!(
        "agentry_store_operations_total",
        "collection" => collection.to_owned(),
        "operation" => operation
    )
    .increment(1);
}

pub struct FileEntityStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    sanitizer: PathSanitizer,
}

impl FileEntityStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
            sanitizer: PathSanitizer::new(),
        }
    }

    /// Store backed by the local disk
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(LocalFileSystem::new()), root)
    }

    /// Store backed by a fresh in-memory tree
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryFileSystem::new()), "/agentry")
    }

    pub fn with_sanitizer(mut self, sanitizer: PathSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build `root/base.../leaf` and verify the resolved result stays inside
    /// both the storage root and `root/base...`
    async fn checked_path(&self, base: &[&str], leaf: &str) -> Result<PathBuf, RepositoryError> {
        self.sanitizer.validate_segments(base.iter().copied())?;
        self.sanitizer.validate_segment(leaf)?;

        let base_path = self.sanitizer.join(&self.root, base)?;
        let candidate = base_path.join(leaf);

        let resolved_root = self.fs.resolve(&self.root).await?;
        let resolved_candidate = self.fs.resolve(&candidate).await?;
        self.sanitizer
            .ensure_contained(&resolved_root, &resolved_candidate)?;

        if !base.is_empty() {
            let resolved_base = self.fs.resolve(&base_path).await?;
            self.sanitizer
                .ensure_contained(&resolved_root, &resolved_base)?;
            self.sanitizer
                .ensure_contained(&resolved_base, &resolved_candidate)?;
        }

        Ok(candidate)
    }

    async fn records_dir(&self, collection: &str) -> Result<PathBuf, RepositoryError> {
        self.checked_path(&[collection], RECORDS_DIR).await
    }

    async fn record_path(&self, collection: &str, id: &str) -> Result<PathBuf, RepositoryError> {
        // The id itself must be a safe segment, not only "<id>.json".
        self.sanitizer.validate_segment(id)?;
        self.checked_path(&[collection, RECORDS_DIR], &format!("{id}{RECORD_EXTENSION}"))
            .await
    }

    async fn attachment_dir(&self, collection: &str, id: &str) -> Result<PathBuf, RepositoryError> {
        self.checked_path(&[collection, FILES_DIR], id).await
    }

    async fn attachment_path(
        &self,
        collection: &str,
        id: &str,
        filename: &str,
    ) -> Result<PathBuf, RepositoryError> {
        self.checked_path(&[collection, FILES_DIR, id], filename).await
    }

    async fn read_record(&self, path: &Path) -> Result<Option<Record>, RepositoryError> {
        let Some(bytes) = self.fs.read(path).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(record) => Ok(Some(record)),
            _ => Err(RepositoryError::Serialization(format!(
                "{} does not contain a JSON object",
                path.display()
            ))),
        }
    }
}

/// Pull the id out of a new record, generating one when absent or empty
fn assign_id(record: &mut Record) -> Result<String, RepositoryError> {
    let id = match record.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) => uuid::Uuid::new_v4().to_string(),
        Some(other) => {
            return Err(RepositoryError::Serialization(format!(
                "record id must be a string, got {}",
                other
            )))
        }
    };
    record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    Ok(id)
}

fn stamp_if_missing(record: &mut Record) {
    let now = Value::String(format_timestamp(chrono::Utc::now()));
    let created = match record.get(CREATED_AT_FIELD) {
        Some(Value::String(ts)) => Value::String(ts.clone()),
        _ => now,
    };
    if !matches!(record.get(UPDATED_AT_FIELD), Some(Value::String(_))) {
        record.insert(UPDATED_AT_FIELD.to_string(), created.clone());
    }
    record.insert(CREATED_AT_FIELD.to_string(), created);
}

#[async_trait]
impl EntityStore for FileEntityStore {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        self.fs.create_dir_all(&self.root).await?;
        debug!(root = %self.root.display(), "Entity store initialized");
        Ok(())
    }

    async fn create(&self, collection: &str, mut record: Record) -> Result<Record, RepositoryError> {
        let id = assign_id(&mut record)?;
        let path = self.record_path(collection, &id).await?;
        let dir = self.records_dir(collection).await?;
        stamp_if_missing(&mut record);

        let bytes = serde_json::to_vec_pretty(&record)?;
        self.fs.create_dir_all(&dir).await?;
        match self.fs.write_new(&path, &bytes).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(_)) => {
                return Err(RepositoryError::DuplicateId {
                    collection: collection.to_string(),
                    id,
                });
            }
            Err(e) => return Err(e.into()),
        }

        count_operation(collection, "create");
        debug!(collection = %collection, id = %id, "Record created");
        Ok(record)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, RepositoryError> {
        let path = self.record_path(collection, id).await?;
        count_operation(collection, "get");
        self.read_record(&path).await
    }

    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Record>, RepositoryError> {
        let dir = self.records_dir(collection).await?;
        let mut records = Vec::new();

        for name in self.fs.list_files(&dir).await? {
            let Some(id) = name.strip_suffix(RECORD_EXTENSION) else {
                continue;
            };
            match self.read_record(&dir.join(&name)).await {
                Ok(Some(record)) if query.matches(&record) => records.push(record),
                Ok(_) => {}
                Err(e) => {
                    warn!(collection = %collection, id = %id, error = %e, "Skipping unreadable record");
                }
            }
        }

        query.sort(&mut records);
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        count_operation(collection, "list");
        Ok(records)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> Result<Option<Record>, RepositoryError> {
        let path = self.record_path(collection, id).await?;
        let Some(mut record) = self.read_record(&path).await? else {
            return Ok(None);
        };

        let updated_at = next_timestamp(record.get(UPDATED_AT_FIELD));
        merge_patch(&mut record, patch);
        record.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(format_timestamp(updated_at)),
        );

        let bytes = serde_json::to_vec_pretty(&record)?;
        self.fs.write_atomic(&path, &bytes).await?;

        count_operation(collection, "update");
        debug!(collection = %collection, id = %id, "Record updated");
        Ok(Some(record))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, RepositoryError> {
        let path = self.record_path(collection, id).await?;
        let attachments = self.attachment_dir(collection, id).await?;

        let existed = self.fs.remove_file(&path).await?;
        if existed {
            self.fs.remove_dir_all(&attachments).await?;
            count_operation(collection, "delete");
            debug!(collection = %collection, id = %id, "Record deleted");
        }
        Ok(existed)
    }

    async fn save_file(
        &self,
        collection: &str,
        id: &str,
        filename: &str,
        contents: &[u8],
    ) -> Result<(), RepositoryError> {
        let record_path = self.record_path(collection, id).await?;
        let dir = self.attachment_dir(collection, id).await?;
        let path = self.attachment_path(collection, id, filename).await?;

        if self.fs.read(&record_path).await?.is_none() {
            return Err(RepositoryError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        self.fs.create_dir_all(&dir).await?;
        self.fs.write_atomic(&path, contents).await?;
        count_operation(collection, "save_file");
        debug!(collection = %collection, id = %id, filename = %filename, "Attachment saved");
        Ok(())
    }

    async fn read_file(
        &self,
        collection: &str,
        id: &str,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError> {
        let path = self.attachment_path(collection, id, filename).await?;
        Ok(self.fs.read(&path).await?)
    }

    async fn list_files(&self, collection: &str, id: &str) -> Result<Vec<String>, RepositoryError> {
        let dir = self.attachment_dir(collection, id).await?;
        let mut names = self.fs.list_files(&dir).await?;
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::path_sanitizer::PathSanitizerError;
    use crate::domain::record::SortDirection;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let store = FileEntityStore::in_memory();
        let created = store
            .create("agents", rec(json!({"name": "Reviewer"})))
            .await
            .unwrap();

        let id = created["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(created["createdAt"], created["updatedAt"]);

        let fetched = store.get("agents", id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_rejects_non_string_id() {
        let store = FileEntityStore::in_memory();
        let result = store.create("agents", rec(json!({"id": 7}))).await;
        assert!(matches!(result, Err(RepositoryError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_dot_id_is_rejected_even_though_dot_json_is_a_valid_name() {
        let store = FileEntityStore::in_memory();
        let result = store.create("agents", rec(json!({"id": "."}))).await;
        assert!(matches!(
            result,
            Err(RepositoryError::InvalidPath(PathSanitizerError::PathTraversal(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_limit_applies_after_sort() {
        let store = FileEntityStore::in_memory();
        for (id, rank) in [("a", 2), ("b", 3), ("c", 1)] {
            store
                .create("items", rec(json!({"id": id, "rank": rank})))
                .await
                .unwrap();
        }
        let query = ListQuery::new()
            .sort_by("rank", SortDirection::Desc)
            .limit(2);
        let ids: Vec<_> = store
            .list("items", &query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_list_of_unknown_collection_is_empty() {
        let store = FileEntityStore::in_memory();
        assert!(store.list("nothing", &ListQuery::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_cannot_rename_record() {
        let store = FileEntityStore::in_memory();
        store.create("agents", rec(json!({"id": "a1"}))).await.unwrap();
        let updated = store
            .update("agents", "a1", rec(json!({"id": "a2", "name": "x"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["id"], "a1");
        assert!(store.get("agents", "a2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_attachments() {
        let store = FileEntityStore::in_memory();
        store.create("agents", rec(json!({"id": "a1"}))).await.unwrap();
        store.save_file("agents", "a1", "prompt.md", b"hi").await.unwrap();

        assert!(store.delete("agents", "a1").await.unwrap());
        store.create("agents", rec(json!({"id": "a1"}))).await.unwrap();
        assert!(store.list_files("agents", "a1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_file_and_sibling_attachments_are_disjoint() {
        let store = FileEntityStore::in_memory();
        store.create("c", rec(json!({"id": "foo"}))).await.unwrap();
        store.create("c", rec(json!({"id": "foo.json"}))).await.unwrap();
        store.save_file("c", "foo.json", "notes.txt", b"x").await.unwrap();

        assert!(store.delete("c", "foo.json").await.unwrap());
        assert!(store.get("c", "foo").await.unwrap().is_some());
        assert!(store.get("c", "foo.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_file_requires_record() {
        let store = FileEntityStore::in_memory();
        let result = store.save_file("agents", "ghost", "notes.txt", b"x").await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }
}
