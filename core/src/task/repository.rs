//! Task repository traits
//!
//! Defines the interfaces for task storage and for the list cache.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::model::Task;
use crate::Result;

/// Repository interface for task CRUD operations against the backing store
///
/// Implementations enforce id uniqueness and bound every call with their own
/// deadline; a timeout surfaces as [`crate::Error::Storage`].
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new task, returning the stored row
    async fn create(&self, task: Task) -> Result<Task>;

    /// Get a task by ID, failing with `TaskNotFound` when no row matches
    async fn get(&self, id: Uuid) -> Result<Task>;

    /// Get all tasks, oldest first
    async fn list(&self) -> Result<Vec<Task>>;

    /// Update title, description, status and `updated_at` of an existing task
    ///
    /// `id` and `created_at` are preserved from the stored row.
    async fn update(&self, task: Task) -> Result<Task>;

    /// Delete a task by ID, failing with `TaskNotFound` when nothing was removed
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Whole-collection cache of the task list
///
/// The cache is advisory. Callers treat every error as a miss.
#[async_trait]
pub trait TaskCache: Send + Sync {
    /// Return the cached collection, or `None` when nothing is cached
    async fn get_tasks(&self) -> Result<Option<Vec<Task>>>;

    /// Replace the cached collection, expiring after `ttl`
    async fn set_tasks(&self, tasks: &[Task], ttl: Duration) -> Result<()>;

    /// Drop the cached collection
    async fn invalidate(&self) -> Result<()>;

    /// Short backend name for logs and health reporting
    fn backend(&self) -> &'static str;
}

/// Cache used when caching is disabled: always empty, writes are discarded
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTaskCache;

#[async_trait]
impl TaskCache for NoopTaskCache {
    async fn get_tasks(&self) -> Result<Option<Vec<Task>>> {
        Ok(None)
    }

    async fn set_tasks(&self, _tasks: &[Task], _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn invalidate(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "disabled"
    }
}
