// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::application::error::ServiceError;
use crate::domain::agent::{AgentFilter, AgentPatch, CustomAgent, NewAgent};
use crate::domain::lifecycle::StatusCounts;
use async_trait::async_trait;

#[async_trait]
pub trait AgentService: Send + Sync {
    async fn create_agent(&self, draft: NewAgent) -> Result<CustomAgent, ServiceError>;
    async fn get_agent(&self, id: &str) -> Result<Option<CustomAgent>, ServiceError>;
    async fn list_agents(&self, filter: AgentFilter) -> Result<Vec<CustomAgent>, ServiceError>;
    async fn update_agent(&self, id: &str, patch: AgentPatch) -> Result<CustomAgent, ServiceError>;
    async fn delete_agent(&self, id: &str) -> Result<bool, ServiceError>;
    async fn activate_agent(&self, id: &str) -> Result<CustomAgent, ServiceError>;
    async fn toggle_archive_agent(&self, id: &str) -> Result<CustomAgent, ServiceError>;
    async fn status_counts(&self) -> Result<StatusCounts, ServiceError>;
}
