//! Completion matrix - one boolean flag per (test, device) pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use crate::id::{CellKey, DeviceId, TestId};

/// A single persisted cell of the completion matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionCell {
    /// Test identifier
    pub test: TestId,

    /// Device identifier
    pub device: DeviceId,

    /// Whether the test has been completed on this device
    pub done: bool,
}

/// Completion flags keyed by (test, device).
///
/// Cells missing from the matrix are unchecked. Serialized as a list of
/// [`CompletionCell`] rows since JSON objects cannot carry composite keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CompletionCell>", into = "Vec<CompletionCell>")]
pub struct CompletionMatrix {
    cells: BTreeMap<CellKey, bool>,
}

impl CompletionMatrix {
    /// Create an empty matrix (nothing checked).
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a cell is checked.
    pub fn is_done(&self, key: &CellKey) -> bool {
        self.cells.get(key).copied().unwrap_or(false)
    }

    /// Set a cell. Returns the previous value.
    pub fn set(&mut self, key: CellKey, done: bool) -> bool {
        self.cells.insert(key, done).unwrap_or(false)
    }

    /// Checked cells, in key order.
    pub fn checked(&self) -> impl Iterator<Item = &CellKey> {
        self.cells.iter().filter(|(_, done)| **done).map(|(key, _)| key)
    }

    /// Number of checked cells.
    pub fn checked_count(&self) -> usize {
        self.checked().count()
    }

    /// Uncheck every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// All stored cells with their flags.
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, bool)> {
        self.cells.iter().map(|(key, done)| (key, *done))
    }
}

impl From<Vec<CompletionCell>> for CompletionMatrix {
    fn from(rows: Vec<CompletionCell>) -> Self {
        let cells = rows
            .into_iter()
            .map(|row| (CellKey::new(row.test, row.device), row.done))
            .collect();
        Self { cells }
    }
}

impl From<CompletionMatrix> for Vec<CompletionCell> {
    fn from(matrix: CompletionMatrix) -> Self {
        matrix
            .cells
            .into_iter()
            .map(|(key, done)| CompletionCell {
                test: key.test,
                device: key.device,
                done,
            })
            .collect()
    }
}

impl FromIterator<(CellKey, bool)> for CompletionMatrix {
    fn from_iter<I: IntoIterator<Item = (CellKey, bool)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}
