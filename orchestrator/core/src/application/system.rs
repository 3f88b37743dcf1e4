// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! System service: CRUD and lifecycle for agent chains.
//!
//! Built-in systems are read-only through this service. Every mutating call
//! loads the record first and refuses with [`ServiceError::BuiltInImmutable`]
//! before anything is written.

use crate::application::error::{require_name, ServiceError};
use crate::domain::lifecycle::{LifecycleStatus, StatusCounts};
use crate::domain::record::{collections, ListQuery, Record, SortDirection, UPDATED_AT_FIELD};
use crate::domain::repository::{to_record, Collection, EntityStore};
use crate::domain::system::{NewSystem, System, SystemFilter, SystemPatch};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait SystemService: Send + Sync {
    async fn create_system(&self, draft: NewSystem) -> Result<System, ServiceError>;
    async fn get_system(&self, id: &str) -> Result<Option<System>, ServiceError>;
    async fn list_systems(&self, filter: SystemFilter) -> Result<Vec<System>, ServiceError>;
    async fn update_system(&self, id: &str, patch: SystemPatch) -> Result<System, ServiceError>;
    async fn delete_system(&self, id: &str) -> Result<bool, ServiceError>;
    async fn activate_system(&self, id: &str) -> Result<System, ServiceError>;
    async fn toggle_archive_system(&self, id: &str) -> Result<System, ServiceError>;
    async fn status_counts(&self) -> Result<StatusCounts, ServiceError>;
}

pub struct StandardSystemService {
    systems: Collection<System>,
}

impl StandardSystemService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            systems: Collection::new(store, collections::SYSTEMS),
        }
    }

    /// Load a system that is about to be mutated
    async fn require_mutable(&self, id: &str) -> Result<System, ServiceError> {
        let system = self
            .systems
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::system_not_found(id))?;
        if system.is_built_in() {
            warn!(system_id = %id, "Rejected mutation of built-in system");
            return Err(ServiceError::BuiltInImmutable(id.to_string()));
        }
        Ok(system)
    }

    /// Names are unique per store, compared case-insensitively
    async fn ensure_unique_name(&self, name: &str, except: Option<&str>) -> Result<(), ServiceError> {
        let wanted = name.trim().to_lowercase();
        let clash = self
            .systems
            .list(&ListQuery::new())
            .await?
            .into_iter()
            .any(|system| Some(system.id.as_str()) != except && system.name.to_lowercase() == wanted);
        if clash {
            return Err(ServiceError::DuplicateName {
                kind: "System",
                name: name.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn set_status(&self, id: &str, status: LifecycleStatus) -> Result<System, ServiceError> {
        let mut patch = Record::new();
        patch.insert("status".to_string(), Value::from(status.as_str()));
        self.systems
            .update(id, patch)
            .await?
            .ok_or_else(|| ServiceError::system_not_found(id))
    }
}

#[async_trait]
impl SystemService for StandardSystemService {
    async fn create_system(&self, draft: NewSystem) -> Result<System, ServiceError> {
        require_name(&draft.name)?;
        self.ensure_unique_name(&draft.name, None).await?;
        let system = self.systems.create(&System::new(draft)).await?;
        info!(system_id = %system.id, built_in = system.built_in, "System created");
        Ok(system)
    }

    async fn get_system(&self, id: &str) -> Result<Option<System>, ServiceError> {
        Ok(self.systems.get(id).await?)
    }

    async fn list_systems(&self, filter: SystemFilter) -> Result<Vec<System>, ServiceError> {
        let mut query = ListQuery::new().sort_by(UPDATED_AT_FIELD, SortDirection::Desc);
        if let Some(status) = filter.status {
            query = query.filter("status", status.as_str());
        }
        if let Some(category) = filter.category {
            query = query.filter("category", category);
        }
        if let Some(built_in) = filter.built_in {
            query = query.filter("builtIn", built_in);
        }
        Ok(self.systems.list(&query).await?)
    }

    async fn update_system(&self, id: &str, mut patch: SystemPatch) -> Result<System, ServiceError> {
        self.require_mutable(id).await?;
        if let Some(name) = patch.name.as_mut() {
            require_name(name)?;
            self.ensure_unique_name(name, Some(id)).await?;
            *name = name.trim().to_string();
        }
        self.systems
            .update(id, to_record(&patch)?)
            .await?
            .ok_or_else(|| ServiceError::system_not_found(id))
    }

    async fn delete_system(&self, id: &str) -> Result<bool, ServiceError> {
        match self.require_mutable(id).await {
            Ok(_) => {}
            Err(ServiceError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        }
        let deleted = self.systems.delete(id).await?;
        if deleted {
            info!(system_id = %id, "System deleted");
        }
        Ok(deleted)
    }

    async fn activate_system(&self, id: &str) -> Result<System, ServiceError> {
        let current = self.require_mutable(id).await?;
        let next = current.status.activate()?;
        self.set_status(id, next).await
    }

    async fn toggle_archive_system(&self, id: &str) -> Result<System, ServiceError> {
        let current = self.require_mutable(id).await?;
        let next = current.status.toggle_archive()?;
        self.set_status(id, next).await
    }

    async fn status_counts(&self) -> Result<StatusCounts, ServiceError> {
        let systems = self.systems.list(&ListQuery::new()).await?;
        Ok(StatusCounts::tally(systems.into_iter().map(|s| s.status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::FileEntityStore;

    fn service() -> StandardSystemService {
        StandardSystemService::new(Arc::new(FileEntityStore::in_memory()))
    }

    #[tokio::test]
    async fn test_update_and_filter() {
        let service = service();
        let system = service
            .create_system(NewSystem {
                name: "Review chain".into(),
                category: Some("review".into()),
                agent_ids: vec!["a1".into()],
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = service
            .update_system(
                &system.id,
                SystemPatch {
                    agent_ids: Some(vec!["a1".into(), "a2".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.agent_ids, vec!["a1", "a2"]);
        assert_eq!(updated.category, "review");

        let found = service
            .list_systems(SystemFilter {
                category: Some("review".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(service
            .list_systems(SystemFilter {
                built_in: Some(true),
                ..Default::default()
            })
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_false() {
        assert!(!service().delete_system("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_draft_cannot_be_archived() {
        let service = service();
        let system = service
            .create_system(NewSystem {
                name: "Chain".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(
            service.toggle_archive_system(&system.id).await,
            Err(ServiceError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_names_are_unique_ignoring_case() {
        let service = service();
        let chain = service
            .create_system(NewSystem {
                name: "Chain".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let other = service
            .create_system(NewSystem {
                name: "Other".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let duplicate = service
            .create_system(NewSystem {
                name: " chain ".into(),
                ..Default::default()
            })
            .await;
        assert!(matches!(
            duplicate,
            Err(ServiceError::DuplicateName { kind: "System", .. })
        ));

        let renamed = service
            .update_system(
                &other.id,
                SystemPatch {
                    name: Some("CHAIN".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(renamed, Err(ServiceError::DuplicateName { .. })));

        // Keeping its own name is not a clash
        service
            .update_system(
                &chain.id,
                SystemPatch {
                    name: Some("chain".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
}
