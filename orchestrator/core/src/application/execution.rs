// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Execution tracking: run a system in the background and record its fate.
//!
//! [`ExecutionTracker::run`] persists the execution, moves it to `running`
//! and returns immediately. A detached task then invokes the
//! [`SystemExecutor`] and writes exactly one terminal state. The store is the
//! only hand-off point between the task and callers, who poll
//! [`ExecutionTracker::get_execution`].
//!
//! Terminal writes for one execution are serialized by an in-process lock and
//! re-check the persisted status under it, so whichever writer gets there
//! first wins and later writers leave the record alone.

use crate::application::error::ServiceError;
use crate::application::system::SystemService;
use crate::domain::events::ExecutionEvent;
use crate::domain::execution::{
    history_query, Execution, ExecutionError, ExecutionFailure, FailureKind, RunRequest,
};
use crate::domain::executor::SystemExecutor;
use crate::domain::node_config::ExecutionConfig;
use crate::domain::record::collections;
use crate::domain::repository::{to_record, Collection, EntityStore, RepositoryError};
use crate::infrastructure::event_bus::EventBus;
use chrono::Utc;
use dashmap::DashMap;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Supervision knobs for background runs
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// `None` lets a run take as long as it needs
    pub timeout: Option<Duration>,
    pub persist_attempts: u32,
    pub persist_backoff: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self::from(&ExecutionConfig::default())
    }
}

impl From<&ExecutionConfig> for TrackerSettings {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            timeout: config.timeout(),
            persist_attempts: config.persist_attempts.max(1),
            persist_backoff: config.persist_backoff(),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Completed(Value),
    Failed(ExecutionFailure),
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("System not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Service(ServiceError),

    #[error(transparent)]
    Transition(#[from] ExecutionError),
}

impl From<ServiceError> for TrackerError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Repository(e) => TrackerError::Repository(e),
            other => TrackerError::Service(other),
        }
    }
}

fn count_execution(outcome: &'static str) {
    metrics::counter!("agentry_executions_total", "outcome" => outcome).increment(1);
}

#[derive(Clone)]
pub struct ExecutionTracker {
    executions: Collection<Execution>,
    systems: Arc<dyn SystemService>,
    executor: Arc<dyn SystemExecutor>,
    event_bus: EventBus,
    settings: TrackerSettings,
    terminal_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ExecutionTracker {
    pub fn new(
        store: Arc<dyn EntityStore>,
        systems: Arc<dyn SystemService>,
        executor: Arc<dyn SystemExecutor>,
        event_bus: EventBus,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            executions: Collection::new(store, collections::EXECUTIONS),
            systems,
            executor,
            event_bus,
            settings,
            terminal_locks: Arc::new(DashMap::new()),
        }
    }

    /// Start a run of `request.system_id` and return the `running` record
    ///
    /// Fails with [`TrackerError::NotFound`] before anything is persisted
    /// when the system does not exist. Once the execution has been created,
    /// every later failure is recorded on it instead of being returned; if
    /// the `running` state cannot be stored the run is failed and that
    /// record is returned.
    pub async fn run(&self, request: RunRequest) -> Result<Execution, TrackerError> {
        if self.systems.get_system(&request.system_id).await?.is_none() {
            return Err(TrackerError::NotFound(request.system_id));
        }

        let pending = self.executions.create(&Execution::new(request)).await?;
        let execution = match self.record_start(&pending).await {
            Ok(execution) => execution,
            Err(e) => return Ok(self.abandon_start(pending, e).await),
        };

        info!(
            execution_id = %execution.id,
            system_id = %execution.system_id,
            "Execution started"
        );
        count_execution("started");
        self.event_bus
            .publish_execution_event(ExecutionEvent::ExecutionStarted {
                execution_id: execution.id.clone(),
                system_id: execution.system_id.clone(),
                started_at: execution.started_at.unwrap_or_else(Utc::now),
            });

        let tracker = self.clone();
        let background = execution.clone();
        tokio::spawn(async move {
            tracker.drive(background).await;
        });

        Ok(execution)
    }

    async fn record_start(&self, pending: &Execution) -> Result<Execution, TrackerError> {
        let mut execution = pending.clone();
        execution.start()?;
        self.executions
            .update(&execution.id, to_record(&execution)?)
            .await?
            .ok_or_else(|| {
                RepositoryError::NotFound {
                    collection: collections::EXECUTIONS.to_string(),
                    id: execution.id.clone(),
                }
                .into()
            })
    }

    /// The record exists but could not be moved to `running`: fail it
    /// instead of leaving it `pending` with nothing left to drive it
    async fn abandon_start(&self, pending: Execution, cause: TrackerError) -> Execution {
        warn!(
            execution_id = %pending.id,
            error = %cause,
            "Failed to record execution start"
        );
        let failure = ExecutionFailure::new(
            FailureKind::Error,
            format!("Failed to record execution start: {}", cause),
        );
        if let Err(e) = self
            .finish(&pending.id, ExecutionOutcome::Failed(failure.clone()))
            .await
        {
            error!(
                execution_id = %pending.id,
                error = %e,
                "Failed to record execution outcome"
            );
        }

        match self.executions.get(&pending.id).await {
            Ok(Some(stored)) if stored.is_terminal() => stored,
            _ => {
                let mut execution = pending;
                // Pending -> failed is always a legal transition
                let _ = execution.fail(failure);
                execution
            }
        }
    }

    pub async fn get_execution(&self, id: &str) -> Result<Option<Execution>, TrackerError> {
        Ok(self.executions.get(id).await?)
    }

    /// Execution history, newest first
    pub async fn list_executions(
        &self,
        system_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Execution>, TrackerError> {
        Ok(self
            .executions
            .list(&history_query(system_id, limit))
            .await?)
    }

    /// Background half of `run`
    async fn drive(&self, execution: Execution) {
        let outcome = self.invoke(&execution).await;
        if let Err(e) = self.finish(&execution.id, outcome).await {
            error!(
                execution_id = %execution.id,
                error = %e,
                "Failed to record execution outcome"
            );
        }
    }

    async fn invoke(&self, execution: &Execution) -> ExecutionOutcome {
        // The system may have been removed between `run` and now.
        let system = match self.systems.get_system(&execution.system_id).await {
            Ok(Some(system)) => system,
            Ok(None) => {
                return ExecutionOutcome::Failed(ExecutionFailure::new(
                    FailureKind::SystemNotFound,
                    format!("System not found: {}", execution.system_id),
                ))
            }
            Err(e) => {
                return ExecutionOutcome::Failed(ExecutionFailure::new(
                    FailureKind::Error,
                    format!("Failed to load system {}: {}", execution.system_id, e),
                ))
            }
        };

        let call = AssertUnwindSafe(self.executor.execute(
            &system,
            &execution.input,
            &execution.variables,
            execution.project_path.as_deref(),
        ))
        .catch_unwind();

        let result = match self.settings.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    return ExecutionOutcome::Failed(ExecutionFailure::new(
                        FailureKind::Timeout,
                        format!("Execution timed out after {}s", limit.as_secs_f64()),
                    ))
                }
            },
            None => call.await,
        };

        match result {
            Ok(Ok(value)) => ExecutionOutcome::Completed(value),
            Ok(Err(e)) => {
                ExecutionOutcome::Failed(ExecutionFailure::new(FailureKind::Error, format!("{:#}", e)))
            }
            Err(panic) => ExecutionOutcome::Failed(ExecutionFailure::new(
                FailureKind::Panic,
                panic_message(panic.as_ref()),
            )),
        }
    }

    /// Record a terminal outcome for `id`
    ///
    /// Returns `Ok(true)` when this call performed the transition and
    /// `Ok(false)` when the execution was already terminal (or is gone).
    pub async fn finish(&self, id: &str, outcome: ExecutionOutcome) -> Result<bool, TrackerError> {
        let lock = self
            .terminal_locks
            .entry(id.to_string())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.finish_locked(id, outcome).await
        };
        drop(lock);

        // Only the map holds the lock once no other writer is waiting on it.
        self.terminal_locks
            .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn finish_locked(
        &self,
        id: &str,
        outcome: ExecutionOutcome,
    ) -> Result<bool, TrackerError> {
        let mut execution = match self.executions.get(id).await? {
            Some(execution) => execution,
            None => {
                warn!(execution_id = %id, "Execution vanished before it could be finalized");
                return Ok(false);
            }
        };
        if execution.is_terminal() {
            debug!(
                execution_id = %id,
                status = %execution.status,
                "Execution already terminal; ignoring late outcome"
            );
            return Ok(false);
        }

        match outcome {
            ExecutionOutcome::Completed(value) => execution.complete(value)?,
            ExecutionOutcome::Failed(failure) => execution.fail(failure)?,
        }

        let stored = self.persist_terminal(&execution).await?;

        let finished_at = stored.completed_at.unwrap_or_else(Utc::now);
        match &stored.error {
            None => {
                let duration_ms = stored
                    .started_at
                    .map(|started| (finished_at - started).num_milliseconds().max(0) as u64)
                    .unwrap_or(0);
                info!(execution_id = %id, duration_ms, "Execution completed");
                count_execution("completed");
                self.event_bus
                    .publish_execution_event(ExecutionEvent::ExecutionCompleted {
                        execution_id: stored.id.clone(),
                        system_id: stored.system_id.clone(),
                        duration_ms,
                        completed_at: finished_at,
                    });
            }
            Some(failure) => {
                warn!(
                    execution_id = %id,
                    kind = ?failure.kind,
                    message = %failure.message,
                    "Execution failed"
                );
                count_execution("failed");
                self.event_bus
                    .publish_execution_event(ExecutionEvent::ExecutionFailed {
                        execution_id: stored.id.clone(),
                        system_id: stored.system_id.clone(),
                        failure: failure.clone(),
                        failed_at: finished_at,
                    });
            }
        }
        Ok(true)
    }

    async fn persist_terminal(&self, execution: &Execution) -> Result<Execution, TrackerError> {
        let attempts = self.settings.persist_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = self
                .executions
                .update(&execution.id, to_record(execution)?)
                .await;
            match result {
                Ok(Some(stored)) => return Ok(stored),
                Ok(None) => {
                    return Err(RepositoryError::NotFound {
                        collection: collections::EXECUTIONS.to_string(),
                        id: execution.id.clone(),
                    }
                    .into())
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        execution_id = %execution.id,
                        attempt,
                        error = %e,
                        "Persisting terminal state failed; retrying"
                    );
                    tokio::time::sleep(self.settings.persist_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("Executor panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("Executor panicked: {}", msg)
    } else {
        "Executor panicked".to_string()
    }
}
