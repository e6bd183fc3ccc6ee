//! Task use-case
//!
//! Coordinates the task store with the whole-list cache. The store is
//! authoritative; the cache is populated on list misses and dropped after
//! every successful write. Cache failures are logged and never returned.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::model::{parse_task_id, Task, TaskInput};
use super::pagination::PageRequest;
use super::repository::{TaskCache, TaskRepository};
use crate::{Error, Result};

/// How long a list snapshot stays in the cache
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Task CRUD with cache-aside listing
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskRepository>,
    cache: Arc<dyn TaskCache>,
    cache_ttl: Duration,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskRepository>, cache: Arc<dyn TaskCache>) -> Self {
        Self {
            store,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Override the list snapshot TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    /// Validate and store a new task
    ///
    /// A caller-supplied id is kept; otherwise a fresh one is assigned.
    pub async fn create(&self, input: TaskInput) -> Result<Task> {
        tracing::debug!(title = %input.title, "Starting task creation");
        let status = input.validate().inspect_err(|e| {
            tracing::warn!(error = %e, "Task validation failed");
        })?;

        let now = Utc::now();
        let task = Task {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            title: input.title,
            description: input.description,
            status,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .store
            .create(task)
            .await
            .inspect_err(|e| log_store_failure("create", e))?;

        self.invalidate_cache("create").await;
        tracing::info!(task_id = %created.id, "Task created");
        Ok(created)
    }

    /// Fetch one task straight from the store
    pub async fn get(&self, id: &str) -> Result<Task> {
        let id = parse_task_id(id)?;
        self.store
            .get(id)
            .await
            .inspect_err(|e| log_store_failure("get", e))
    }

    /// One page of the task list, served from the cache when it holds a snapshot
    pub async fn list(&self, page: PageRequest) -> Result<Vec<Task>> {
        match self.cache.get_tasks().await {
            Ok(Some(tasks)) if !tasks.is_empty() => {
                tracing::debug!(count = tasks.len(), "Tasks retrieved from cache");
                return Ok(page.slice(&tasks).to_vec());
            }
            Ok(_) => tracing::debug!("Cache miss, retrieving from store"),
            Err(e) => tracing::warn!(error = %e, "Cache read failed, retrieving from store"),
        }

        let tasks = self
            .store
            .list()
            .await
            .inspect_err(|e| log_store_failure("list", e))?;

        // A write that commits and invalidates between the read above and this
        // refill leaves a stale snapshot until the TTL expires.
        if let Err(e) = self.cache.set_tasks(&tasks, self.cache_ttl).await {
            tracing::warn!(error = %e, "Failed to populate task cache");
        }

        tracing::debug!(count = tasks.len(), "Tasks listed from store");
        Ok(page.slice(&tasks).to_vec())
    }

    /// Validate and apply new field values to an existing task
    pub async fn update(&self, id: &str, input: TaskInput) -> Result<Task> {
        let id = parse_task_id(id)?;
        let status = input.validate().inspect_err(|e| {
            tracing::warn!(task_id = %id, error = %e, "Validation failed during task update");
        })?;

        // created_at is ignored by the store; the stored value wins.
        let now = Utc::now();
        let task = Task {
            id,
            title: input.title,
            description: input.description,
            status,
            created_at: now,
            updated_at: now,
        };

        let updated = self
            .store
            .update(task)
            .await
            .inspect_err(|e| log_store_failure("update", e))?;

        self.invalidate_cache("update").await;
        tracing::info!(task_id = %updated.id, "Task updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = parse_task_id(id)?;
        self.store
            .delete(id)
            .await
            .inspect_err(|e| log_store_failure("delete", e))?;

        self.invalidate_cache("delete").await;
        tracing::info!(task_id = %id, "Task deleted");
        Ok(())
    }

    async fn invalidate_cache(&self, after: &'static str) {
        if let Err(e) = self.cache.invalidate().await {
            tracing::warn!(after, error = %e, "Failed to invalidate task cache");
        }
    }
}

fn log_store_failure(operation: &'static str, error: &Error) {
    if error.is_client_error() {
        tracing::warn!(operation, error = %error, "Task operation rejected");
    } else {
        tracing::error!(operation, error = %error, "Task operation failed");
    }
}
