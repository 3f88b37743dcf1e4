// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::application::agent::AgentService;
use crate::application::error::{require_name, ServiceError};
use crate::domain::agent::{AgentFilter, AgentPatch, CustomAgent, NewAgent};
use crate::domain::events::AgentLifecycleEvent;
use crate::domain::lifecycle::{LifecycleStatus, StatusCounts};
use crate::domain::record::{collections, ListQuery, Record, SortDirection, UPDATED_AT_FIELD};
use crate::domain::repository::{to_record, Collection, EntityStore};
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub struct StandardAgentService {
    agents: Collection<CustomAgent>,
    event_bus: EventBus,
}

impl StandardAgentService {
    pub fn new(store: Arc<dyn EntityStore>, event_bus: EventBus) -> Self {
        Self {
            agents: Collection::new(store, collections::AGENTS),
            event_bus,
        }
    }

    async fn require_agent(&self, id: &str) -> Result<CustomAgent, ServiceError> {
        self.agents
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::agent_not_found(id))
    }

    /// Names are unique ignoring case; `except` skips the agent being renamed
    async fn ensure_unique_name(&self, name: &str, except: Option<&str>) -> Result<(), ServiceError> {
        let wanted = name.trim().to_lowercase();
        let clash = self
            .agents
            .list(&ListQuery::new())
            .await?
            .into_iter()
            .any(|agent| Some(agent.id.as_str()) != except && agent.name.to_lowercase() == wanted);
        if clash {
            return Err(ServiceError::DuplicateName {
                kind: "Agent",
                name: name.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn set_status(&self, id: &str, status: LifecycleStatus) -> Result<CustomAgent, ServiceError> {
        let mut patch = Record::new();
        patch.insert("status".to_string(), Value::from(status.as_str()));
        self.agents
            .update(id, patch)
            .await?
            .ok_or_else(|| ServiceError::agent_not_found(id))
    }
}

#[async_trait]
impl AgentService for StandardAgentService {
    async fn create_agent(&self, draft: NewAgent) -> Result<CustomAgent, ServiceError> {
        require_name(&draft.name)?;
        self.ensure_unique_name(&draft.name, None).await?;

        let agent = self.agents.create(&CustomAgent::new(draft)).await?;
        info!(agent_id = %agent.id, name = %agent.name, "Agent created");

        self.event_bus.publish_agent_event(AgentLifecycleEvent::AgentCreated {
            agent_id: agent.id.clone(),
            name: agent.name.clone(),
            created_at: agent.created_at,
        });
        Ok(agent)
    }

    async fn get_agent(&self, id: &str) -> Result<Option<CustomAgent>, ServiceError> {
        Ok(self.agents.get(id).await?)
    }

    async fn list_agents(&self, filter: AgentFilter) -> Result<Vec<CustomAgent>, ServiceError> {
        let mut query = ListQuery::new().sort_by(UPDATED_AT_FIELD, SortDirection::Desc);
        if let Some(status) = filter.status {
            query = query.filter("status", status.as_str());
        }
        if let Some(owner) = filter.owner {
            query = query.filter("owner", owner);
        }
        Ok(self.agents.list(&query).await?)
    }

    async fn update_agent(&self, id: &str, mut patch: AgentPatch) -> Result<CustomAgent, ServiceError> {
        self.require_agent(id).await?;

        if let Some(name) = patch.name.as_mut() {
            require_name(name)?;
            self.ensure_unique_name(name, Some(id)).await?;
            *name = name.trim().to_string();
        }

        let agent = self
            .agents
            .update(id, to_record(&patch)?)
            .await?
            .ok_or_else(|| ServiceError::agent_not_found(id))?;

        self.event_bus.publish_agent_event(AgentLifecycleEvent::AgentUpdated {
            agent_id: agent.id.clone(),
            updated_at: agent.updated_at,
        });
        Ok(agent)
    }

    async fn delete_agent(&self, id: &str) -> Result<bool, ServiceError> {
        let deleted = self.agents.delete(id).await?;
        if deleted {
            info!(agent_id = %id, "Agent deleted");
            self.event_bus.publish_agent_event(AgentLifecycleEvent::AgentDeleted {
                agent_id: id.to_string(),
                deleted_at: Utc::now(),
            });
        }
        Ok(deleted)
    }

    async fn activate_agent(&self, id: &str) -> Result<CustomAgent, ServiceError> {
        let current = self.require_agent(id).await?;
        let next = current.status.activate()?;
        let agent = self.set_status(id, next).await?;

        info!(agent_id = %id, "Agent activated");
        self.event_bus
            .publish_agent_event(AgentLifecycleEvent::status_changed(id, next));
        Ok(agent)
    }

    async fn toggle_archive_agent(&self, id: &str) -> Result<CustomAgent, ServiceError> {
        let current = self.require_agent(id).await?;
        let next = current.status.toggle_archive()?;
        let agent = self.set_status(id, next).await?;

        info!(agent_id = %id, from = %current.status, to = %next, "Agent archive toggled");
        let event = match next {
            LifecycleStatus::Active => AgentLifecycleEvent::AgentRestored {
                agent_id: id.to_string(),
                restored_at: agent.updated_at,
            },
            other => AgentLifecycleEvent::status_changed(id, other),
        };
        self.event_bus.publish_agent_event(event);
        Ok(agent)
    }

    async fn status_counts(&self) -> Result<StatusCounts, ServiceError> {
        let agents = self.agents.list(&ListQuery::new()).await?;
        Ok(StatusCounts::tally(agents.into_iter().map(|a| a.status)))
    }
}
