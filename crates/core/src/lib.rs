//! chartrack core data models.
//!
//! This crate defines the data structures behind the characterization
//! progress tracker: the statically configured lab plan, the completion
//! matrix, and the persisted progress record.

#![warn(missing_docs)]

// Identities
mod id;

// Lab plan
mod config;

// Completion state
mod matrix;
mod record;

// Presentation helpers
mod time;

// Re-exports
pub use id::*;

pub use config::{LabConfig, LabTest, ConfigError};
pub use matrix::{CompletionMatrix, CompletionCell};
pub use record::{InvalidPercent, ProgressRecord, SessionState};
pub use time::format_minutes;

/// Calendar date type used for history keys.
pub type Date = chrono::NaiveDate;
