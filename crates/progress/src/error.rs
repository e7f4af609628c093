//! Progress errors.

use chartrack_core::{ConfigError, InvalidPercent};
use chartrack_storage::StorageError;

/// Result type for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors raised by aggregation and session operations.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// The plan has no effort to divide by (no tests or no devices)
    #[error("cannot compute a percentage of zero total minutes")]
    DivisionByZero,

    /// Percentage outside 0-100; nothing is recorded
    #[error(transparent)]
    InvalidPercent(#[from] InvalidPercent),

    /// Invalid plan or unknown cell
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The durable record could not be read or written
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
}
