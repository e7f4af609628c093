//! Storage abstraction and implementations for chartrack.
//!
//! This crate provides trait-based persistence for the progress record and
//! the completion matrix, with a JSON file reference implementation and an
//! optional standalone SQLite completion-flag table.

#![warn(missing_docs)]

pub mod trait_;
#[cfg(feature = "json")]
pub mod json_storage;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use trait_::{ProgressStore, CompletionStore, StorageError, Result};
#[cfg(feature = "json")]
pub use json_storage::JsonStorage;
#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;
