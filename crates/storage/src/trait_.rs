//! Storage trait abstraction.

use async_trait::async_trait;
use chartrack_core::{CompletionMatrix, ProgressRecord};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// A missing record is never an error: loads fall back to the default.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Durable home of the [`ProgressRecord`].
///
/// Implementations replace the whole record on every save.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load the record, or the default record when none was saved yet.
    async fn load_progress(&self) -> Result<ProgressRecord>;

    /// Replace the stored record.
    async fn save_progress(&mut self, record: &ProgressRecord) -> Result<()>;
}

/// Durable home of the [`CompletionMatrix`].
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Load the matrix, or an empty one when none was saved yet.
    async fn load_matrix(&self) -> Result<CompletionMatrix>;

    /// Replace the stored matrix.
    async fn save_matrix(&mut self, matrix: &CompletionMatrix) -> Result<()>;

    /// Uncheck every cell.
    async fn reset_matrix(&mut self) -> Result<()>;
}
