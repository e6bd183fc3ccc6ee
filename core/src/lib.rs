//! Core library for the task service
//!
//! This crate contains the core business logic, including:
//! - The task entity and its validation rules
//! - Store and cache repository interfaces with their adapters
//! - The task use-case that coordinates the store with the list cache

pub mod error;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
