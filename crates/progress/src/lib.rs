//! Progress Tracking
//!
//! Aggregates the completion matrix into effort metrics, drives the tracking
//! session against injected storage, and reports the daily trend.

#![warn(missing_docs)]

pub mod aggregator;
pub mod error;
pub mod tracker;
pub mod trend;

pub use aggregator::{compute_progress, summarize, ProgressSummary};
pub use error::{ProgressError, Result};
pub use tracker::{ProgressTracker, ProgressSnapshot};
pub use trend::{daily_trend, TrendPoint};
