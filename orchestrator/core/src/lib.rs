// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agentry core
//!
//! Persistence and execution tracking for agent configurations and the
//! systems that chain them.
//!
//! # Architecture
//!
//! - **domain:** records, aggregates, path safety and the storage contracts
//! - **application:** agent/system services and the execution tracker
//! - **infrastructure:** filesystem backends, the file-backed store, event bus

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
