// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Systems: named chains of agents.
//!
//! A built-in system ships with the product and has no owner among the
//! current users. Its structure is immutable; the rule is enforced by the
//! system service, the store itself has no notion of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lifecycle::LifecycleStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub status: LifecycleStatus,
    #[serde(default)]
    pub built_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Ordered agent ids making up the chain
    #[serde(default)]
    pub agent_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String { "general".to_string() }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSystem {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub built_in: bool,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub agent_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SystemFilter {
    pub status: Option<LifecycleStatus>,
    pub category: Option<String>,
    pub built_in: Option<bool>,
}

impl System {
    pub fn new(draft: NewSystem) -> Self {
        let now = Utc::now();
        Self {
            id: draft
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: draft.name.trim().to_string(),
            description: draft.description,
            category: draft
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(default_category),
            // Built-ins are published ready to run.
            status: if draft.built_in {
                LifecycleStatus::Active
            } else {
                LifecycleStatus::Draft
            },
            built_in: draft.built_in,
            owner: draft.owner,
            agent_ids: draft.agent_ids,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_built_in(&self) -> bool {
        self.built_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_system_defaults() {
        let system = System::new(NewSystem {
            name: "Code review".into(),
            category: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(system.category, "general");
        assert_eq!(system.status, LifecycleStatus::Draft);
        assert!(!system.is_built_in());
    }

    #[test]
    fn test_built_in_starts_active() {
        let system = System::new(NewSystem {
            name: "Triage".into(),
            built_in: true,
            ..Default::default()
        });
        assert_eq!(system.status, LifecycleStatus::Active);
        let value = serde_json::to_value(&system).unwrap();
        assert_eq!(value["builtIn"], true);
    }
}
