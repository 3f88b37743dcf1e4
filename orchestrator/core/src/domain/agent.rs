// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lifecycle::LifecycleStatus;

/// A user-defined agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAgent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub status: LifecycleStatus,
    #[serde(default)]
    pub model_config: ModelConfig,
    /// Tool names the agent may call
    #[serde(default)]
    pub tools: Vec<String>,
    /// MCP server identifiers attached to the agent
    #[serde(default)]
    pub mcp_servers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

// Defaults
fn default_provider() -> String { "anthropic".to_string() }
fn default_model() -> String { "default".to_string() }
fn default_temperature() -> f64 { 0.7 }

/// Input for creating an agent; omitted fields take their defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub model_config: Option<ModelConfig>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// Partial update; `None` leaves the field unchanged
///
/// Status is deliberately absent: it only moves through `activate` and
/// `toggle_archive`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_config: Option<ModelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub status: Option<LifecycleStatus>,
    pub owner: Option<String>,
}

impl CustomAgent {
    pub fn new(draft: NewAgent) -> Self {
        let now = Utc::now();
        Self {
            id: draft
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: draft.name.trim().to_string(),
            description: draft.description,
            system_prompt: draft.system_prompt,
            status: LifecycleStatus::Draft,
            model_config: draft.model_config.unwrap_or_default(),
            tools: draft.tools,
            mcp_servers: draft.mcp_servers,
            owner: draft.owner,
            created_at: now,
            updated_at: now,
        }
    }
}
