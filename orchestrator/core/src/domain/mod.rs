// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent;
pub mod events;
pub mod execution;
pub mod executor;
pub mod lifecycle;
pub mod node_config;
pub mod path_sanitizer;
pub mod record;
pub mod repository;
pub mod storage;
pub mod system;
