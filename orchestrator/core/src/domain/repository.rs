// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract shared by every aggregate. Instead of one repository
//! trait per aggregate, a single keyed-document [`EntityStore`] is partitioned
//! into named collections; [`Collection`] binds a collection name to a serde
//! record type at the call site.
//!
//! | Collection | Record type | Service |
//! |------------|-------------|---------|
//! | `agents` | `CustomAgent` | `StandardAgentService` |
//! | `systems` | `System` | `StandardSystemService` |
//! | `executions` | `Execution` | `ExecutionTracker` |
//!
//! ## Absence vs. failure
//!
//! `get`/`update` on an absent but *safe* id return `Ok(None)`: absence is
//! data. Only unsafe identifiers and I/O failures are errors.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::path_sanitizer::PathSanitizerError;
use crate::domain::record::{ListQuery, Record};
use crate::domain::storage::StorageError;

/// Keyed-document storage partitioned into named collections
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Ensure the storage root exists (idempotent)
    async fn initialize(&self) -> Result<(), RepositoryError>;

    /// Insert a new record, assigning an id when absent
    async fn create(&self, collection: &str, record: Record) -> Result<Record, RepositoryError>;

    /// Fetch a record by id
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>, RepositoryError>;

    /// List records matching every filter, ordered per the query
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Record>, RepositoryError>;

    /// Shallow-merge `patch` into the stored record and bump `updatedAt`
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> Result<Option<Record>, RepositoryError>;

    /// Remove a record and its attachments, returning whether it existed
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, RepositoryError>;

    /// Attach a blob to an existing record
    async fn save_file(
        &self,
        collection: &str,
        id: &str,
        filename: &str,
        contents: &[u8],
    ) -> Result<(), RepositoryError>;

    /// Read an attached blob
    async fn read_file(
        &self,
        collection: &str,
        id: &str,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError>;

    /// Names of the blobs attached to a record, sorted
    async fn list_files(&self, collection: &str, id: &str) -> Result<Vec<String>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathSanitizerError),

    #[error("Duplicate id '{id}' in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    #[error("Entity not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Typed view of one collection
///
/// Converts between the record type `T` and the store's JSON documents.
pub struct Collection<T> {
    store: Arc<dyn EntityStore>,
    name: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name,
            _record: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(store: Arc<dyn EntityStore>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub async fn create(&self, record: &T) -> Result<T, RepositoryError> {
        let stored = self.store.create(self.name, to_record(record)?).await?;
        from_record(stored)
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        self.store
            .get(self.name, id)
            .await?
            .map(from_record)
            .transpose()
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<T>, RepositoryError> {
        self.store
            .list(self.name, query)
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }

    pub async fn update(&self, id: &str, patch: Record) -> Result<Option<T>, RepositoryError> {
        self.store
            .update(self.name, id, patch)
            .await?
            .map(from_record)
            .transpose()
    }

    pub async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        self.store.delete(self.name, id).await
    }
}

/// Serialize a typed record into a JSON document
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, RepositoryError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::Serialization(format!(
            "record must serialize to a JSON object, got {}",
            other
        ))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, RepositoryError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct Named {
        id: String,
        name: String,
    }

    #[test]
    fn test_to_record_requires_object() {
        let record = to_record(&Named {
            id: "n1".into(),
            name: "x".into(),
        })
        .unwrap();
        assert_eq!(record["id"], "n1");
        assert!(matches!(
            to_record(&42),
            Err(RepositoryError::Serialization(_))
        ));
    }

    #[test]
    fn test_from_record_reports_shape_errors() {
        let mut record = Record::new();
        record.insert("id".into(), Value::from("n1"));
        let result: Result<Named, _> = from_record(record);
        assert!(matches!(result, Err(RepositoryError::Serialization(_))));
    }
}
