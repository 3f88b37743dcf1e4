// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage Infrastructure Module
//!
//! Concrete implementations of the [`FileSystem`] trait.

pub mod local;
pub mod memory;

pub use local::LocalFileSystem;
pub use memory::InMemoryFileSystem;

use std::sync::Arc;
use crate::domain::storage::FileSystem;

/// Filesystem backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Real directory tree (production)
    Local,

    /// Process-local tree (testing, ephemeral runs)
    Memory,
}

/// Factory function to create a filesystem from configuration
pub fn create_file_system(backend: StorageBackend) -> Arc<dyn FileSystem> {
    match backend {
        StorageBackend::Local => Arc::new(LocalFileSystem::new()),
        StorageBackend::Memory => Arc::new(InMemoryFileSystem::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn test_factory_backends_are_usable() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        for (backend, root) in [
            (StorageBackend::Local, temp_dir.path().to_path_buf()),
            (StorageBackend::Memory, Path::new("/mem").to_path_buf()),
        ] {
            let fs = create_file_system(backend);
            fs.create_dir_all(&root).await.unwrap();
            fs.write_new(&root.join("probe"), b"ok").await.unwrap();
            assert_eq!(fs.read(&root.join("probe")).await.unwrap().unwrap(), b"ok");
        }
    }
}
