// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedded services
//!
//! Builds the store and domain services in-process from configuration. The
//! CLI only reads and manages records; it never runs systems.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use agentry_core::{
    application::{
        agent::AgentService, lifecycle::StandardAgentService, system::StandardSystemService,
        system::SystemService,
    },
    domain::{
        execution::{history_query, Execution},
        node_config::AgentryConfig,
        record::collections,
        repository::{Collection, EntityStore},
    },
    infrastructure::{
        event_bus::EventBus,
        repositories::FileEntityStore,
        storage::{create_file_system, StorageBackend},
    },
};

pub struct EmbeddedServices {
    pub agents: Arc<dyn AgentService>,
    pub systems: Arc<dyn SystemService>,
    executions: Collection<Execution>,
}

impl EmbeddedServices {
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config =
            AgentryConfig::load_or_default(config_path).context("Failed to load configuration")?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AgentryConfig) -> Result<Self> {
        config
            .validate()
            .context("Configuration validation failed")?;

        let backend = match config.spec.storage.backend.as_str() {
            "memory" => StorageBackend::Memory,
            _ => StorageBackend::Local,
        };
        let store: Arc<dyn EntityStore> = Arc::new(FileEntityStore::new(
            create_file_system(backend),
            config.spec.storage.root.clone(),
        ));
        store.initialize().await.with_context(|| {
            format!(
                "Failed to initialize storage at {}",
                config.spec.storage.root.display()
            )
        })?;

        tracing::debug!(
            root = %config.spec.storage.root.display(),
            backend = %config.spec.storage.backend,
            "Embedded services ready"
        );

        let event_bus = EventBus::new(config.spec.events.capacity);
        Ok(Self {
            agents: Arc::new(StandardAgentService::new(store.clone(), event_bus)),
            systems: Arc::new(StandardSystemService::new(store.clone())),
            executions: Collection::new(store, collections::EXECUTIONS),
        })
    }

    pub async fn get_execution(&self, id: &str) -> Result<Option<Execution>> {
        Ok(self.executions.get(id).await?)
    }

    /// Execution history, newest first
    pub async fn list_executions(
        &self,
        system_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Execution>> {
        Ok(self
            .executions
            .list(&history_query(system_id, Some(limit)))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_core::domain::agent::NewAgent;

    #[tokio::test]
    async fn test_services_share_one_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = AgentryConfig::default();
        config.spec.storage.root = temp_dir.path().join("data");

        let services = EmbeddedServices::from_config(config.clone()).await.unwrap();
        let agent = services
            .agents
            .create_agent(NewAgent {
                name: "Reviewer".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        // A second instance over the same root sees the record
        let reopened = EmbeddedServices::from_config(config).await.unwrap();
        assert!(reopened.agents.get_agent(&agent.id).await.unwrap().is_some());
        assert!(reopened.list_executions(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = AgentryConfig::default();
        config.kind = "NodeConfig".into();
        assert!(EmbeddedServices::from_config(config).await.is_err());
    }
}
