//! Redis-backed list cache
//!
//! The whole task collection is stored as one JSON array under [`TASKS_KEY`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::model::Task;
use super::repository::TaskCache;
use crate::{Error, Result};

/// Key holding the serialized task list
pub const TASKS_KEY: &str = "tasks";

/// Build a `redis://` URL from the host:port, optional password and database index
pub fn connection_url(addr: &str, password: &str, db: i64) -> String {
    if password.is_empty() {
        format!("redis://{}/{}", addr, db)
    } else {
        format!("redis://:{}@{}/{}", password, addr, db)
    }
}

/// Decode a cached task list; a payload that is not a task array is a cache error
fn decode_snapshot(json: &str) -> Result<Vec<Task>> {
    serde_json::from_str(json).map_err(|e| Error::Cache(format!("corrupt cached task list: {}", e)))
}

async fn within_deadline<T, F>(timeout: Duration, operation: &str, command: F) -> Result<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(timeout, command).await {
        Ok(result) => result.map_err(|e| Error::Cache(format!("{} failed: {}", operation, e))),
        Err(_) => Err(Error::Cache(format!(
            "{} timed out after {:?}",
            operation, timeout
        ))),
    }
}

/// List cache stored in Redis
///
/// [`ConnectionManager`] reconnects on its own and is cheap to clone, so one
/// instance is shared by all requests.
#[derive(Clone)]
pub struct RedisTaskCache {
    connection: ConnectionManager,
    timeout: Duration,
}

impl RedisTaskCache {
    /// Connect to `url` and check that the server answers
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::Cache(e.to_string()))?;
        let connection = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| Error::Cache(format!("connect timed out after {:?}", timeout)))?
            .map_err(|e| Error::Cache(format!("failed to connect to Redis: {}", e)))?;

        let cache = Self {
            connection,
            timeout,
        };
        cache.ping().await?;
        tracing::info!("Connected to Redis successfully");
        Ok(cache)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: String = self
            .with_deadline("ping", async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }

    async fn with_deadline<T, F>(&self, operation: &str, command: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        within_deadline(self.timeout, operation, command).await
    }
}

#[async_trait]
impl TaskCache for RedisTaskCache {
    async fn get_tasks(&self) -> Result<Option<Vec<Task>>> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = self
            .with_deadline("GET", async move {
                redis::cmd("GET").arg(TASKS_KEY).query_async(&mut conn).await
            })
            .await?;

        payload.as_deref().map(decode_snapshot).transpose()
    }

    async fn set_tasks(&self, tasks: &[Task], ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(tasks)?;
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();
        self.with_deadline("SET", async move {
            redis::cmd("SET")
                .arg(TASKS_KEY)
                .arg(json)
                .arg("EX")
                .arg(seconds)
                .query_async(&mut conn)
                .await
        })
        .await
    }

    async fn invalidate(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: i64 = self
            .with_deadline("DEL", async move {
                redis::cmd("DEL").arg(TASKS_KEY).query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
