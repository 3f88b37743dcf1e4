// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use agentry_core::application::agent::AgentService;
use agentry_core::application::error::ServiceError;
use agentry_core::application::lifecycle::StandardAgentService;
use agentry_core::application::system::{StandardSystemService, SystemService};
use agentry_core::domain::agent::{AgentFilter, NewAgent};
use agentry_core::domain::lifecycle::LifecycleStatus;
use agentry_core::domain::repository::{EntityStore, RepositoryError};
use agentry_core::domain::system::{NewSystem, SystemFilter, SystemPatch};
use agentry_core::infrastructure::event_bus::EventBus;
use agentry_core::infrastructure::repositories::FileEntityStore;
use std::sync::Arc;
use tempfile::TempDir;

async fn services() -> (TempDir, StandardAgentService, StandardSystemService) {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn EntityStore> = Arc::new(FileEntityStore::local(temp_dir.path()));
    store.initialize().await.unwrap();
    (
        temp_dir,
        StandardAgentService::new(store.clone(), EventBus::new(16)),
        StandardSystemService::new(store),
    )
}

#[tokio::test]
async fn test_agent_status_scenario() {
    let (_temp_dir, agents, _) = services().await;

    agents
        .create_agent(NewAgent {
            id: Some("a1".into()),
            name: "Reviewer".into(),
            system_prompt: "Review the change for bugs".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let agent = agents.get_agent("a1").await.unwrap().unwrap();
    assert_eq!(agent.status, LifecycleStatus::Draft);

    let agent = agents.activate_agent("a1").await.unwrap();
    assert_eq!(agent.status, LifecycleStatus::Active);

    let agent = agents.toggle_archive_agent("a1").await.unwrap();
    assert_eq!(agent.status, LifecycleStatus::Archived);

    let agent = agents.toggle_archive_agent("a1").await.unwrap();
    assert_eq!(agent.status, LifecycleStatus::Active);

    // Persisted, not just returned
    let stored = agents.get_agent("a1").await.unwrap().unwrap();
    assert_eq!(stored.status, LifecycleStatus::Active);
    assert_eq!(stored.system_prompt, "Review the change for bugs");
}

#[tokio::test]
async fn test_activation_restricted_to_draft() {
    let (_temp_dir, agents, _) = services().await;
    let agent = agents
        .create_agent(NewAgent {
            name: "Planner".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(matches!(
        agents.toggle_archive_agent(&agent.id).await,
        Err(ServiceError::InvalidTransition(_))
    ));
    agents.activate_agent(&agent.id).await.unwrap();
    assert!(matches!(
        agents.activate_agent(&agent.id).await,
        Err(ServiceError::InvalidTransition(_))
    ));
}

#[tokio::test]
async fn test_unsafe_agent_id_surfaces_invalid_path() {
    let (temp_dir, agents, _) = services().await;
    let result = agents
        .create_agent(NewAgent {
            id: Some("../etc".into()),
            name: "Evil".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Repository(RepositoryError::InvalidPath(_)))
    ));
    assert!(std::fs::read_dir(temp_dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_agent_status_counts_and_filters() {
    let (_temp_dir, agents, _) = services().await;
    let mut ids = Vec::new();
    for name in ["One", "Two", "Three", "Four"] {
        let agent = agents
            .create_agent(NewAgent {
                name: name.into(),
                owner: Some("u1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        ids.push(agent.id);
    }
    agents.activate_agent(&ids[0]).await.unwrap();
    agents.activate_agent(&ids[1]).await.unwrap();
    agents.toggle_archive_agent(&ids[1]).await.unwrap();

    let counts = agents.status_counts().await.unwrap();
    assert_eq!(
        (counts.draft, counts.active, counts.archived, counts.total),
        (2, 1, 1, 4)
    );

    let drafts = agents
        .list_agents(AgentFilter {
            status: Some(LifecycleStatus::Draft),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(drafts.len(), 2);

    let none = agents
        .list_agents(AgentFilter {
            owner: Some("someone-else".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());

    assert!(agents.delete_agent(&ids[3]).await.unwrap());
    assert_eq!(agents.status_counts().await.unwrap().total, 3);
}

#[tokio::test]
async fn test_built_in_system_is_immutable() {
    let (_temp_dir, _, systems) = services().await;
    let built_in = systems
        .create_system(NewSystem {
            id: Some("triage".into()),
            name: "Triage".into(),
            built_in: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(built_in.status, LifecycleStatus::Active);

    let update = systems
        .update_system(
            "triage",
            SystemPatch {
                name: Some("Hijacked".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(update, Err(ServiceError::BuiltInImmutable(_))));
    assert!(matches!(
        systems.delete_system("triage").await,
        Err(ServiceError::BuiltInImmutable(_))
    ));
    assert!(matches!(
        systems.toggle_archive_system("triage").await,
        Err(ServiceError::BuiltInImmutable(_))
    ));

    let stored = systems.get_system("triage").await.unwrap().unwrap();
    assert_eq!(stored, built_in);
}

#[tokio::test]
async fn test_user_system_lifecycle_and_counts() {
    let (_temp_dir, _, systems) = services().await;
    let chain = systems
        .create_system(NewSystem {
            name: "Review chain".into(),
            agent_ids: vec!["a1".into(), "a2".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    systems
        .create_system(NewSystem {
            name: "Triage".into(),
            built_in: true,
            ..Default::default()
        })
        .await
        .unwrap();

    systems.activate_system(&chain.id).await.unwrap();
    let archived = systems.toggle_archive_system(&chain.id).await.unwrap();
    assert_eq!(archived.status, LifecycleStatus::Archived);

    let counts = systems.status_counts().await.unwrap();
    assert_eq!((counts.active, counts.archived, counts.total), (1, 1, 2));

    let built_ins = systems
        .list_systems(SystemFilter {
            built_in: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(built_ins.len(), 1);
    assert_eq!(built_ins[0].name, "Triage");

    assert!(systems.delete_system(&chain.id).await.unwrap());
    assert!(systems.get_system(&chain.id).await.unwrap().is_none());
}
