// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent;
pub mod error;
pub mod execution;
pub mod lifecycle;
pub mod system;

pub use agent::AgentService;
pub use error::ServiceError;
pub use execution::{ExecutionOutcome, ExecutionTracker, TrackerError, TrackerSettings};
pub use lifecycle::StandardAgentService;
pub use system::{StandardSystemService, SystemService};
