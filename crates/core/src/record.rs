//! Progress record - tracking session plus daily completion history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use crate::Date;

/// A completion percentage outside 0-100 (NaN and infinities included).
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("completion percentage out of range: {0}")]
pub struct InvalidPercent(pub f64);

/// Lifecycle of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session is running; daily recording is ignored
    NotStarted,
    /// A session is running since `start_date`
    Started,
}

/// The durable progress record.
///
/// `history` maps calendar days to the completion percentage recorded on that
/// day. It survives stopping a session and resetting the matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Day the current session started, if any
    #[serde(default)]
    pub start_date: Option<Date>,

    /// Completion percentage per day (0-100)
    #[serde(default)]
    pub history: BTreeMap<Date, f64>,
}

impl ProgressRecord {
    /// Current session state.
    pub fn state(&self) -> SessionState {
        if self.start_date.is_some() {
            SessionState::Started
        } else {
            SessionState::NotStarted
        }
    }

    /// Whether a session is running.
    pub fn is_started(&self) -> bool {
        matches!(self.state(), SessionState::Started)
    }

    /// Start a session on `today`.
    ///
    /// Keeps an existing start date and seeds `history[today]` with 0 when the
    /// day has no entry yet. Returns whether the record changed.
    pub fn start(&mut self, today: Date) -> bool {
        let mut changed = false;
        if self.start_date.is_none() {
            self.start_date = Some(today);
            changed = true;
        }
        if !self.history.contains_key(&today) {
            self.history.insert(today, 0.0);
            changed = true;
        }
        changed
    }

    /// Record today's completion percentage. Last write of the day wins.
    ///
    /// No effect unless a session is running. Returns whether the record
    /// changed. Percentages outside 0-100 are refused and leave the record
    /// untouched.
    pub fn record_daily(&mut self, today: Date, percent: f64) -> Result<bool, InvalidPercent> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(InvalidPercent(percent));
        }
        if !self.is_started() {
            return Ok(false);
        }
        Ok(match self.history.insert(today, percent) {
            Some(previous) => previous != percent,
            None => true,
        })
    }

    /// Stop the session. History is kept. Returns whether the record changed.
    pub fn stop(&mut self) -> bool {
        self.start_date.take().is_some()
    }
}
