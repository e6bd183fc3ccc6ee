//! Task module
//!
//! This module contains the task entity, its storage and cache interfaces,
//! their adapters, and the use-case that ties them together.

mod memory_store;
mod model;
mod pagination;
mod postgres_store;
mod redis_cache;
mod repository;
mod service;

pub use memory_store::{InMemoryTaskCache, InMemoryTaskStore};
pub use model::*;
pub use pagination::{PageRequest, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
pub use postgres_store::PostgresTaskStore;
pub use redis_cache::{connection_url, RedisTaskCache, TASKS_KEY};
pub use repository::{NoopTaskCache, TaskCache, TaskRepository};
pub use service::{TaskService, DEFAULT_CACHE_TTL};
