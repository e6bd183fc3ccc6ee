//! PostgreSQL task storage implementation
//!
//! Rows live in the `tasks` table created by the embedded migrations:
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id          UUID PRIMARY KEY,
//!     title       VARCHAR(255) NOT NULL,
//!     description TEXT,
//!     status      VARCHAR(32) NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL,
//!     updated_at  TIMESTAMPTZ NOT NULL
//! );
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Task, TaskStatus};
use super::repository::TaskRepository;
use crate::{Error, Result};

const TASK_COLUMNS: &str = "id, title, description, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = Error;

    fn try_from(row: TaskRow) -> Result<Self> {
        let status: TaskStatus = row.status.parse().map_err(|_| {
            Error::Storage(format!(
                "task {} has unknown status {:?}",
                row.id, row.status
            ))
        })?;
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Task store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresTaskStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Open a pool against `dsn` and check that the database answers
    pub async fn connect(dsn: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect(dsn)
            .await
            .map_err(|e| Error::Storage(format!("failed to connect to database: {}", e)))?;

        let store = Self::new(pool, timeout);
        store
            .with_deadline("ping", sqlx::query("SELECT 1").execute(&store.pool))
            .await?;
        tracing::info!("Connected to database successfully");
        Ok(store)
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("failed to run migrations: {}", e)))
    }

    /// Run `query` under the store deadline; failures are logged by the caller
    async fn with_deadline<T, F>(&self, operation: &str, query: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::Storage(format!("failed to {} task: {}", operation, e))),
            Err(_) => Err(Error::Storage(format!(
                "{} timed out after {:?}",
                operation, self.timeout
            ))),
        }
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        let sql = format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TASK_COLUMNS}"
        );
        let row: TaskRow = self
            .with_deadline(
                "create",
                sqlx::query_as::<_, TaskRow>(&sql)
                    .bind(task.id)
                    .bind(&task.title)
                    .bind(&task.description)
                    .bind(task.status.as_str())
                    .bind(task.created_at)
                    .bind(task.updated_at)
                    .fetch_one(&self.pool),
            )
            .await?;
        row.try_into()
    }

    async fn get(&self, id: Uuid) -> Result<Task> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        let row: Option<TaskRow> = self
            .with_deadline(
                "get",
                sqlx::query_as::<_, TaskRow>(&sql).bind(id).fetch_optional(&self.pool),
            )
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                tracing::warn!(task_id = %id, "Task not found");
                Err(Error::TaskNotFound(id.to_string()))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC, id ASC");
        let rows: Vec<TaskRow> = self
            .with_deadline("list", sqlx::query_as::<_, TaskRow>(&sql).fetch_all(&self.pool))
            .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn update(&self, task: Task) -> Result<Task> {
        let sql = format!(
            "UPDATE tasks SET title = $2, description = $3, status = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {TASK_COLUMNS}"
        );
        let row: Option<TaskRow> = self
            .with_deadline(
                "update",
                sqlx::query_as::<_, TaskRow>(&sql)
                    .bind(task.id)
                    .bind(&task.title)
                    .bind(&task.description)
                    .bind(task.status.as_str())
                    .bind(task.updated_at)
                    .fetch_optional(&self.pool),
            )
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                tracing::warn!(task_id = %task.id, "Task not found for update");
                Err(Error::TaskNotFound(task.id.to_string()))
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = self
            .with_deadline(
                "delete",
                sqlx::query("DELETE FROM tasks WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(task_id = %id, "Task not found for deletion");
            return Err(Error::TaskNotFound(id.to_string()));
        }
        Ok(())
    }
}
