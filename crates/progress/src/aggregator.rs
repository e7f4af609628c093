//! Effort aggregation over the completion matrix.

use std::collections::BTreeMap;

use chartrack_core::{CellKey, CompletionMatrix, LabConfig, TestId};

use crate::error::{ProgressError, Result};

/// Derived effort metrics for one completion matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSummary {
    /// Effort of every (test, device) cell
    pub total_minutes: u64,

    /// Effort of the checked cells
    pub completed_minutes: u64,

    /// `total_minutes - completed_minutes`
    pub remaining_minutes: u64,

    /// Completion percentage (0-100)
    pub percent: f64,
}

impl ProgressSummary {
    fn from_minutes(total_minutes: u64, completed_minutes: u64) -> Result<Self> {
        if total_minutes == 0 {
            return Err(ProgressError::DivisionByZero);
        }

        Ok(Self {
            total_minutes,
            completed_minutes,
            remaining_minutes: total_minutes.saturating_sub(completed_minutes),
            percent: completed_minutes as f64 / total_minutes as f64 * 100.0,
        })
    }
}

/// Compute effort metrics from a matrix and a per-test duration table.
///
/// Every test costs its duration once per device. Checked cells whose test is
/// not in `durations` contribute nothing.
pub fn compute_progress(
    matrix: &CompletionMatrix,
    durations: &BTreeMap<TestId, u32>,
    device_count: usize,
) -> Result<ProgressSummary> {
    let total: u64 = durations
        .values()
        .map(|&minutes| u64::from(minutes) * device_count as u64)
        .sum();

    let completed: u64 = matrix
        .checked()
        .filter_map(|key| durations.get(&key.test))
        .map(|&minutes| u64::from(minutes))
        .sum();

    ProgressSummary::from_minutes(total, completed)
}

/// Compute effort metrics for the configured plan.
///
/// Walks the plan's (test, device) pairs, so cells outside the plan are never
/// counted.
pub fn summarize(config: &LabConfig, matrix: &CompletionMatrix) -> Result<ProgressSummary> {
    let mut total = 0u64;
    let mut completed = 0u64;

    for test in &config.tests {
        for device in &config.devices {
            let minutes = u64::from(test.minutes);
            total += minutes;
            if matrix.is_done(&CellKey::new(test.id.clone(), device.clone())) {
                completed += minutes;
            }
        }
    }

    ProgressSummary::from_minutes(total, completed)
}
