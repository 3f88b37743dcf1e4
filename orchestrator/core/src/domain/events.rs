// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::execution::ExecutionFailure;
use crate::domain::lifecycle::LifecycleStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentLifecycleEvent {
    AgentCreated {
        agent_id: String,
        name: String,
        created_at: DateTime<Utc>,
    },
    AgentUpdated {
        agent_id: String,
        updated_at: DateTime<Utc>,
    },
    AgentActivated {
        agent_id: String,
        activated_at: DateTime<Utc>,
    },
    AgentArchived {
        agent_id: String,
        archived_at: DateTime<Utc>,
    },
    AgentRestored {
        agent_id: String,
        restored_at: DateTime<Utc>,
    },
    AgentDeleted {
        agent_id: String,
        deleted_at: DateTime<Utc>,
    },
}

impl AgentLifecycleEvent {
    pub fn agent_id(&self) -> &str {
        match self {
            Self::AgentCreated { agent_id, .. }
            | Self::AgentUpdated { agent_id, .. }
            | Self::AgentActivated { agent_id, .. }
            | Self::AgentArchived { agent_id, .. }
            | Self::AgentRestored { agent_id, .. }
            | Self::AgentDeleted { agent_id, .. } => agent_id,
        }
    }

    /// Event announcing that an agent moved into `status`
    pub fn status_changed(agent_id: impl Into<String>, status: LifecycleStatus) -> Self {
        let agent_id = agent_id.into();
        let at = Utc::now();
        match status {
            LifecycleStatus::Active => Self::AgentActivated {
                agent_id,
                activated_at: at,
            },
            LifecycleStatus::Archived => Self::AgentArchived {
                agent_id,
                archived_at: at,
            },
            // Nothing transitions back to draft; report it as a plain update.
            LifecycleStatus::Draft => Self::AgentUpdated {
                agent_id,
                updated_at: at,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
    ExecutionStarted {
        execution_id: String,
        system_id: String,
        started_at: DateTime<Utc>,
    },
    ExecutionCompleted {
        execution_id: String,
        system_id: String,
        duration_ms: u64,
        completed_at: DateTime<Utc>,
    },
    ExecutionFailed {
        execution_id: String,
        system_id: String,
        failure: ExecutionFailure,
        failed_at: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> &str {
        match self {
            Self::ExecutionStarted { execution_id, .. }
            | Self::ExecutionCompleted { execution_id, .. }
            | Self::ExecutionFailed { execution_id, .. } => execution_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::FailureKind;

    #[test]
    fn test_status_changed_maps_to_variant() {
        let event = AgentLifecycleEvent::status_changed("a1", LifecycleStatus::Archived);
        assert!(matches!(event, AgentLifecycleEvent::AgentArchived { .. }));
        assert_eq!(event.agent_id(), "a1");

        let event = AgentLifecycleEvent::status_changed("a1", LifecycleStatus::Active);
        assert!(matches!(event, AgentLifecycleEvent::AgentActivated { .. }));
    }

    #[test]
    fn test_execution_failed_serialization() {
        let event = ExecutionEvent::ExecutionFailed {
            execution_id: "e1".into(),
            system_id: "s1".into(),
            failure: ExecutionFailure::new(FailureKind::Timeout, "too slow"),
            failed_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ExecutionFailed"));
        assert!(json.contains("\"timeout\""));
        assert_eq!(event.execution_id(), "e1");
    }
}
