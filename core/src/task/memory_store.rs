//! In-memory task store and list cache
//!
//! Process-local implementations of [`TaskRepository`] and [`TaskCache`],
//! used for local runs and as deterministic doubles in tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use super::model::Task;
use super::repository::{TaskCache, TaskRepository};
use crate::{Error, Result};

/// In-memory task store keyed by id
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(Error::Storage(format!(
                "Task with ID {} already exists",
                task.id
            )));
        }
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get(&self, id: Uuid) -> Result<Task> {
        let tasks = self.tasks.read().await;
        tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut tasks: Vec<Task> = tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn update(&self, task: Task) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks
            .get_mut(&task.id)
            .ok_or_else(|| Error::TaskNotFound(task.id.to_string()))?;
        stored.title = task.title;
        stored.description = task.description;
        stored.status = task.status;
        stored.updated_at = task.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::TaskNotFound(id.to_string())),
        }
    }
}

struct Snapshot {
    tasks: Vec<Task>,
    expires_at: Instant,
}

/// In-memory list cache honouring the TTL
#[derive(Default)]
pub struct InMemoryTaskCache {
    snapshot: RwLock<Option<Snapshot>>,
}

impl InMemoryTaskCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskCache for InMemoryTaskCache {
    async fn get_tasks(&self) -> Result<Option<Vec<Task>>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .as_ref()
            .filter(|s| s.expires_at > Instant::now())
            .map(|s| s.tasks.clone()))
    }

    async fn set_tasks(&self, tasks: &[Task], ttl: Duration) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        *snapshot = Some(Snapshot {
            tasks: tasks.to_vec(),
            expires_at: Instant::now() + ttl,
        });
        Ok(())
    }

    async fn invalidate(&self) -> Result<()> {
        self.snapshot.write().await.take();
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
