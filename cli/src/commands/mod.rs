// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Agentry CLI

pub mod agent;
pub mod config;
pub mod execution;
pub mod system;

pub use self::agent::AgentCommand;
pub use self::config::ConfigCommand;
pub use self::execution::ExecutionCommand;
pub use self::system::SystemCommand;
