// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Provider
//!
//! `tokio::fs` implementation of [`FileSystem`] for single-node deployments.
//!
//! **Atomicity:**
//! - `write_atomic` stages the contents in a hidden sibling file, fsyncs it,
//!   then renames it over the destination.
//! - `write_new` stages the same way, then hard-links the staging file to the
//!   destination; `link(2)` refuses to overwrite, which makes create-if-absent
//!   a single atomic step.
//!
//! **Limitations:**
//! - Staging files left behind by a crash are ignored by `list_files` but not
//!   garbage-collected.
//! - Hard links require the staging file and destination on one filesystem,
//!   which holds because they are siblings.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::domain::storage::{is_temp_file, temp_sibling, FileSystem, StorageError};

/// Local filesystem provider
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Write `contents` to a fresh staging file next to `path`
    async fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf, StorageError> {
        let temp = temp_sibling(path);
        let result = async {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(contents).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StorageError::io(&temp, "write staging file", e));
        }
        Ok(temp)
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::io(path, "create directory", e))
    }

    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, "read", e)),
        }
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let temp = Self::stage(path, contents).await?;
        if let Err(e) = tokio::fs::rename(&temp, path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StorageError::io(path, "rename into", e));
        }
        Ok(())
    }

    async fn write_new(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let temp = Self::stage(path, contents).await?;
        let linked = tokio::fs::hard_link(&temp, path).await;
        let _ = tokio::fs::remove_file(&temp).await;

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(path.display().to_string()))
            }
            Err(e) => Err(StorageError::io(path, "link into", e)),
        }
    }

    async fn remove_file(&self, path: &Path) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path, "remove", e)),
        }
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<bool, StorageError> {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path, "remove directory", e)),
        }
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<String>, StorageError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(dir, "list directory", e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(dir, "read directory entry in", e))?
        {
            // file_type() does not follow symlinks; linked files are skipped.
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io(&entry.path(), "stat", e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !is_temp_file(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn resolve(&self, path: &Path) -> Result<PathBuf, StorageError> {
        let mut existing = path.to_path_buf();
        let mut remainder: Vec<OsString> = Vec::new();

        loop {
            match tokio::fs::canonicalize(&existing).await {
                Ok(resolved) => {
                    return Ok(remainder
                        .iter()
                        .rev()
                        .fold(resolved, |acc, part| acc.join(part)));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    let (Some(parent), Some(name)) = (existing.parent(), existing.file_name())
                    else {
                        return Err(StorageError::io(path, "resolve", e));
                    };
                    remainder.push(name.to_os_string());
                    existing = if parent.as_os_str().is_empty() {
                        PathBuf::from(".")
                    } else {
                        parent.to_path_buf()
                    };
                }
                Err(e) => return Err(StorageError::io(path, "resolve", e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_atomic_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = temp_dir.path().join("a.json");

        fs.write_atomic(&path, b"one").await.unwrap();
        fs.write_atomic(&path, b"two").await.unwrap();

        assert_eq!(fs.read(&path).await.unwrap().unwrap(), b"two");
        assert_eq!(fs.list_files(temp_dir.path()).await.unwrap(), vec!["a.json"]);
    }

    #[tokio::test]
    async fn test_write_new_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = temp_dir.path().join("a.json");

        fs.write_new(&path, b"first").await.unwrap();
        let result = fs.write_new(&path, b"second").await;

        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(fs.read(&path).await.unwrap().unwrap(), b"first");
        // No staging files left behind
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_paths_are_not_errors() {
        let temp_dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let missing = temp_dir.path().join("missing");

        assert!(fs.read(&missing).await.unwrap().is_none());
        assert!(!fs.remove_file(&missing).await.unwrap());
        assert!(!fs.remove_dir_all(&missing).await.unwrap());
        assert!(fs.list_files(&missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_appends_missing_tail() {
        let temp_dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let root = std::fs::canonicalize(temp_dir.path()).unwrap();

        let resolved = fs
            .resolve(&temp_dir.path().join("agents").join("a1.json"))
            .await
            .unwrap();
        assert_eq!(resolved, root.join("agents").join("a1.json"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_follows_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("agents")).unwrap();

        let resolved = fs
            .resolve(&temp_dir.path().join("agents").join("a1.json"))
            .await
            .unwrap();
        let outside_root = std::fs::canonicalize(outside.path()).unwrap();
        assert_eq!(resolved, outside_root.join("a1.json"));
    }
}
