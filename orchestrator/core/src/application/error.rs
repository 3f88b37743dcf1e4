// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::lifecycle::LifecycleError;
use crate::domain::repository::RepositoryError;

/// Errors surfaced by the agent and system services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    InvalidTransition(#[from] LifecycleError),

    #[error("System '{0}' is built-in and cannot be modified")]
    BuiltInImmutable(String),

    #[error("{kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn agent_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "Agent",
            id: id.to_string(),
        }
    }

    pub(crate) fn system_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "System",
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Reject blank names before anything reaches the store
pub(crate) fn require_name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation("name cannot be empty".to_string()));
    }
    Ok(())
}
