// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Filesystem Trait - Anti-Corruption Layer for record persistence
//!
//! Abstracts the directory tree the entity store writes into, so the store's
//! rules (path safety, duplicate detection, merge semantics) are testable
//! against an in-memory tree and portable to other backends.
//!
//! Implementations must make `write_atomic` and `write_new` atomic with
//! respect to readers: a concurrent `read` observes either the old contents or
//! the new contents, never a partial file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filesystem abstraction used by the entity store
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Create a directory and all missing parents (idempotent)
    async fn create_dir_all(&self, path: &Path) -> Result<(), StorageError>;

    /// Read a whole file, `Ok(None)` if it does not exist
    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace (or create) a file atomically
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError>;

    /// Create a file atomically, failing with `AlreadyExists` if it is present
    async fn write_new(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError>;

    /// Remove a file, returning whether it existed
    async fn remove_file(&self, path: &Path) -> Result<bool, StorageError>;

    /// Remove a directory tree, returning whether it existed
    async fn remove_dir_all(&self, path: &Path) -> Result<bool, StorageError>;

    /// Names of the regular files directly inside `dir`
    ///
    /// A missing directory yields an empty list. In-flight temporary files
    /// are never reported.
    async fn list_files(&self, dir: &Path) -> Result<Vec<String>, StorageError>;

    /// Resolve a path the way the backend would when opening it
    ///
    /// Symlinks are followed for the longest existing ancestor and the
    /// non-existing remainder is appended lexically.
    async fn resolve(&self, path: &Path) -> Result<PathBuf, StorageError>;
}

/// Filesystem errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl StorageError {
    pub(crate) fn io(path: &Path, action: &str, err: std::io::Error) -> Self {
        StorageError::IoError(format!("Failed to {} {}: {}", action, path.display(), err))
    }
}

/// Suffix used for in-flight temporary files
pub const TEMP_SUFFIX: &str = ".tmp";

/// Hidden sibling path used as the staging file for an atomic write
///
/// The name has a fixed length, independent of the destination's name, so
/// any destination within NAME_MAX can be staged.
pub fn temp_sibling(path: &Path) -> PathBuf {
    path.with_file_name(format!(
        ".{}{}",
        uuid::Uuid::new_v4().simple(),
        TEMP_SUFFIX
    ))
}

/// Whether a directory entry name is a staging file
pub fn is_temp_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_sibling_is_hidden_and_detectable() {
        let long_name = format!("{}.json", "a".repeat(250));
        let temp = temp_sibling(&Path::new("/data/agents").join(&long_name));
        assert_eq!(temp.parent(), Some(Path::new("/data/agents")));
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with('.'));
        assert_eq!(name.len(), 37);
        assert!(is_temp_file(name));
        assert!(!is_temp_file("a1.json"));
    }
}
