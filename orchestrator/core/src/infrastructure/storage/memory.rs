// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory [`FileSystem`] for tests and ephemeral stores.
//!
//! Every operation takes the tree lock once, so writes are trivially atomic
//! with respect to readers. There are no symlinks; `resolve` is lexical.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::domain::storage::{FileSystem, StorageError};

#[derive(Default)]
struct Tree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl Tree {
    fn require_parent(&self, path: &Path) -> Result<(), StorageError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !self.dirs.contains(parent) => {
                Err(StorageError::NotFound(parent.display().to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryFileSystem {
    tree: Arc<RwLock<Tree>>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every file path currently stored, sorted
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.tree.read().files.keys().cloned().collect()
    }
}

/// Lexically normalize a path (drop `.`, fold `..`)
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        let path = normalize(path);
        let mut tree = self.tree.write();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            if tree.files.contains_key(ancestor) {
                return Err(StorageError::AlreadyExists(ancestor.display().to_string()));
            }
            tree.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree.read().files.get(&normalize(path)).cloned())
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let path = normalize(path);
        let mut tree = self.tree.write();
        tree.require_parent(&path)?;
        tree.files.insert(path, contents.to_vec());
        Ok(())
    }

    async fn write_new(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let path = normalize(path);
        let mut tree = self.tree.write();
        tree.require_parent(&path)?;
        if tree.files.contains_key(&path) || tree.dirs.contains(&path) {
            return Err(StorageError::AlreadyExists(path.display().to_string()));
        }
        tree.files.insert(path, contents.to_vec());
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(self.tree.write().files.remove(&normalize(path)).is_some())
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<bool, StorageError> {
        let path = normalize(path);
        let mut tree = self.tree.write();
        // A file at `path` is not a directory and is left alone.
        if !tree.dirs.contains(&path) {
            return Ok(false);
        }
        tree.dirs.retain(|d| !d.starts_with(&path));
        tree.files.retain(|f, _| f == &path || !f.starts_with(&path));
        Ok(true)
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<String>, StorageError> {
        let dir = normalize(dir);
        let tree = self.tree.read();
        Ok(tree
            .files
            .keys()
            .filter(|f| f.parent() == Some(dir.as_path()))
            .filter_map(|f| f.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect())
    }

    async fn resolve(&self, path: &Path) -> Result<PathBuf, StorageError> {
        Ok(normalize(path))
    }
}
