//! Application state

use std::sync::Arc;

use anyhow::Context;
use task_core::task::{
    InMemoryTaskStore, NoopTaskCache, PostgresTaskStore, RedisTaskCache, TaskCache,
    TaskRepository, TaskService,
};

use crate::config::{Config, StoreBackend};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    task_service: TaskService,
}

impl AppState {
    pub fn new(task_service: TaskService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { task_service }),
        }
    }

    /// Connect the store and cache described by `config`
    ///
    /// A Postgres store must be reachable. An unreachable cache only disables caching.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let store = connect_store(config).await?;

        let cache: Arc<dyn TaskCache> = if config.cache_enabled {
            match RedisTaskCache::connect(&config.redis_url(), config.store_timeout).await {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    tracing::warn!("Redis unavailable, running without list cache: {}", e);
                    Arc::new(NoopTaskCache)
                }
            }
        } else {
            tracing::info!("List cache disabled by configuration");
            Arc::new(NoopTaskCache)
        };

        let service = TaskService::new(store, cache).with_cache_ttl(config.cache_ttl);
        Ok(Self::new(service))
    }

    /// Get reference to the task use-case
    pub fn task_service(&self) -> &TaskService {
        &self.inner.task_service
    }
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn TaskRepository>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let store = PostgresTaskStore::connect(
                &config.postgres_dsn,
                config.postgres_max_connections,
                config.store_timeout,
            )
            .await
            .context("Failed to initialize task store")?;
            store
                .migrate()
                .await
                .context("Failed to migrate task store")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory task store; tasks are lost on shutdown");
            Ok(Arc::new(InMemoryTaskStore::new()))
        }
    }
}
