// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the [`EntityStore`] abstraction defined
//! in the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve domain records
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **FileEntityStore** - one JSON file per record over any [`FileSystem`];
//!   `FileEntityStore::local` for disk, `FileEntityStore::in_memory` for tests
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), agentry_core::domain::repository::RepositoryError> {
//! use agentry_core::domain::repository::EntityStore;
//! use agentry_core::infrastructure::repositories::FileEntityStore;
//!
//! let store = FileEntityStore::local("/var/lib/agentry");
//! store.initialize().await?;
//! let agent = store.get("agents", "a1").await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`EntityStore`]: crate::domain::repository::EntityStore
//! [`FileSystem`]: crate::domain::storage::FileSystem

pub mod file_store;

pub use file_store::FileEntityStore;
