//! Progress tracking service.
//!
//! Every operation loads the durable state, applies one change, and writes the
//! whole record back before returning.

use chrono::{DateTime, Utc};
use chartrack_core::{CompletionMatrix, Date, LabConfig, ProgressRecord};
use chartrack_storage::{CompletionStore, ProgressStore};
use tracing::{debug, info};

use crate::aggregator::{summarize, ProgressSummary};
use crate::error::Result;

/// A snapshot of progress at a point in time.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// When snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// Effort metrics for `matrix`
    pub summary: ProgressSummary,

    /// Completion flags
    pub matrix: CompletionMatrix,

    /// Session and daily history
    pub record: ProgressRecord,
}

/// Tracks characterization progress against injected storage.
pub struct ProgressTracker<S> {
    config: LabConfig,
    storage: S,
}

impl<S: ProgressStore + CompletionStore> ProgressTracker<S> {
    /// Create a tracker. The plan is validated once here; an unusable plan is
    /// refused.
    pub fn new(config: LabConfig, storage: S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, storage })
    }

    /// The lab plan.
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// The underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Start a tracking session on `today`.
    pub async fn start(&mut self, today: Date) -> Result<ProgressRecord> {
        let mut record = self.storage.load_progress().await?;
        if record.start(today) {
            self.storage.save_progress(&record).await?;
            info!("Tracking started on {}", record.start_date.unwrap_or(today));
        }
        Ok(record)
    }

    /// Record today's completion percentage if a session is running.
    ///
    /// Returns whether the stored history changed. Percentages outside 0-100
    /// are refused before anything is written.
    pub async fn record_daily(&mut self, today: Date, percent: f64) -> Result<bool> {
        let mut record = self.storage.load_progress().await?;
        if !record.record_daily(today, percent)? {
            debug!("History unchanged for {}", today);
            return Ok(false);
        }
        self.storage.save_progress(&record).await?;
        debug!("Recorded {:.2}% for {}", percent, today);
        Ok(true)
    }

    /// Stop the tracking session. History is kept.
    pub async fn stop(&mut self) -> Result<ProgressRecord> {
        let mut record = self.storage.load_progress().await?;
        if record.stop() {
            self.storage.save_progress(&record).await?;
            info!("Tracking stopped");
        }
        Ok(record)
    }

    /// Uncheck every cell. History is kept.
    pub async fn reset(&mut self) -> Result<()> {
        self.storage.reset_matrix().await?;
        info!("Completion matrix reset");
        Ok(())
    }

    /// Check or uncheck one cell, then recompute and record today's progress.
    pub async fn set_cell(
        &mut self,
        test: &str,
        device: &str,
        done: bool,
        today: Date,
    ) -> Result<ProgressSummary> {
        let key = self.config.cell(test, device)?;

        let mut matrix = self.storage.load_matrix().await?;
        if matrix.set(key.clone(), done) != done {
            self.storage.save_matrix(&matrix).await?;
            debug!("Cell {} set to {}", key, done);
        }

        self.record_summary(&matrix, today).await
    }

    /// Recompute progress from the stored matrix and record it for `today`.
    pub async fn refresh(&mut self, today: Date) -> Result<ProgressSummary> {
        let matrix = self.storage.load_matrix().await?;
        self.record_summary(&matrix, today).await
    }

    /// Current progress without touching storage.
    pub async fn snapshot(&self) -> Result<ProgressSnapshot> {
        let matrix = self.storage.load_matrix().await?;
        let record = self.storage.load_progress().await?;
        let summary = summarize(&self.config, &matrix)?;

        Ok(ProgressSnapshot {
            taken_at: Utc::now(),
            summary,
            matrix,
            record,
        })
    }

    async fn record_summary(
        &mut self,
        matrix: &CompletionMatrix,
        today: Date,
    ) -> Result<ProgressSummary> {
        let summary = summarize(&self.config, matrix)?;
        self.record_daily(today, summary.percent).await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartrack_core::{CellKey, ConfigError, LabTest};
    use chartrack_storage::StorageError;
    use crate::error::ProgressError;

    /// In-memory store that counts writes.
    #[derive(Default)]
    struct MockStorage {
        record: ProgressRecord,
        matrix: CompletionMatrix,
        progress_saves: usize,
        fail_saves: bool,
    }

    #[async_trait::async_trait]
    impl ProgressStore for MockStorage {
        async fn load_progress(&self) -> chartrack_storage::Result<ProgressRecord> {
            Ok(self.record.clone())
        }
        async fn save_progress(&mut self, record: &ProgressRecord) -> chartrack_storage::Result<()> {
            if self.fail_saves {
                return Err(StorageError::Other("disk full".to_string()));
            }
            self.record = record.clone();
            self.progress_saves += 1;
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl CompletionStore for MockStorage {
        async fn load_matrix(&self) -> chartrack_storage::Result<CompletionMatrix> {
            Ok(self.matrix.clone())
        }
        async fn save_matrix(&mut self, matrix: &CompletionMatrix) -> chartrack_storage::Result<()> {
            self.matrix = matrix.clone();
            Ok(())
        }
        async fn reset_matrix(&mut self) -> chartrack_storage::Result<()> {
            self.matrix.clear();
            Ok(())
        }
    }

    fn day(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn tracker() -> ProgressTracker<MockStorage> {
        let config = LabConfig::new(
            vec![LabTest::new("A", 45), LabTest::new("B", 30)],
            vec!["D1".into(), "D2".into()],
        );
        ProgressTracker::new(config, MockStorage::default()).unwrap()
    }

    #[test]
    fn test_new_refuses_empty_plan() {
        let config = LabConfig::new(vec![], vec!["D1".into()]);
        let result = ProgressTracker::new(config, MockStorage::default());
        assert!(matches!(result, Err(ProgressError::Config(ConfigError::NoTests))));
    }

    #[tokio::test]
    async fn test_start_then_record_same_day() {
        let mut tracker = tracker();
        let record = tracker.start(day("2024-01-01")).await.unwrap();
        assert_eq!(record.history[&day("2024-01-01")], 0.0);

        assert!(tracker.record_daily(day("2024-01-01"), 62.5).await.unwrap());
        let record = tracker.storage().record.clone();
        assert_eq!(record.history.len(), 1);
        assert_eq!(record.history[&day("2024-01-01")], 62.5);
    }

    #[tokio::test]
    async fn test_record_daily_twice_is_idempotent() {
        let mut tracker = tracker();
        tracker.start(day("2024-01-01")).await.unwrap();

        assert!(tracker.record_daily(day("2024-01-02"), 20.0).await.unwrap());
        let saves = tracker.storage().progress_saves;
        let before = tracker.storage().record.clone();

        assert!(!tracker.record_daily(day("2024-01-02"), 20.0).await.unwrap());
        assert_eq!(tracker.storage().record, before);
        assert_eq!(tracker.storage().progress_saves, saves);
    }

    #[tokio::test]
    async fn test_record_daily_refuses_invalid_percent() {
        let mut tracker = tracker();
        tracker.start(day("2024-01-01")).await.unwrap();
        tracker.record_daily(day("2024-01-01"), 40.0).await.unwrap();
        let saves = tracker.storage().progress_saves;
        let before = tracker.storage().record.clone();

        for bad in [f64::NAN, f64::INFINITY, 150.0] {
            let result = tracker.record_daily(day("2024-01-02"), bad).await;
            assert!(matches!(result, Err(ProgressError::InvalidPercent(_))));
        }

        assert_eq!(tracker.storage().record, before);
        assert_eq!(tracker.storage().progress_saves, saves);
    }

    #[tokio::test]
    async fn test_set_cell_records_percent_while_started() {
        let mut tracker = tracker();
        tracker.start(day("2024-01-01")).await.unwrap();

        tracker.set_cell("A", "D1", true, day("2024-01-01")).await.unwrap();
        let summary = tracker.set_cell("B", "D1", true, day("2024-01-01")).await.unwrap();

        assert_eq!(summary.completed_minutes, 75);
        assert_eq!(summary.percent, 50.0);
        assert!(tracker.storage().matrix.is_done(&CellKey::new("B", "D1")));
        assert_eq!(tracker.storage().record.history[&day("2024-01-01")], 50.0);
    }

    #[tokio::test]
    async fn test_stop_then_refresh_adds_no_entry() {
        let mut tracker = tracker();
        tracker.start(day("2024-01-01")).await.unwrap();
        tracker.set_cell("A", "D1", true, day("2024-01-01")).await.unwrap();

        let record = tracker.stop().await.unwrap();
        assert!(record.start_date.is_none());
        assert_eq!(record.history.len(), 1);

        tracker.refresh(day("2024-01-02")).await.unwrap();
        tracker.set_cell("A", "D2", true, day("2024-01-02")).await.unwrap();
        let history = &tracker.storage().record.history;
        assert_eq!(history.len(), 1);
        assert!(!history.contains_key(&day("2024-01-02")));
    }

    #[tokio::test]
    async fn test_set_cell_rejects_unknown_cell() {
        let mut tracker = tracker();
        let result = tracker.set_cell("A", "D9", true, day("2024-01-01")).await;
        assert!(matches!(
            result,
            Err(ProgressError::Config(ConfigError::UnknownCell(_)))
        ));
        assert_eq!(tracker.storage().matrix.checked_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_keeps_history() {
        let mut tracker = tracker();
        tracker.start(day("2024-01-01")).await.unwrap();
        tracker.set_cell("A", "D1", true, day("2024-01-01")).await.unwrap();

        tracker.reset().await.unwrap();

        let snapshot = tracker.snapshot().await.unwrap();
        assert_eq!(snapshot.matrix.checked_count(), 0);
        assert_eq!(snapshot.summary.percent, 0.0);
        assert_eq!(snapshot.record.history[&day("2024-01-01")], 30.0);
        assert!(snapshot.record.is_started());
    }

    #[tokio::test]
    async fn test_snapshot_is_stamped_when_taken() {
        let tracker = tracker();
        let before = Utc::now();
        let snapshot = tracker.snapshot().await.unwrap();
        let after = Utc::now();

        assert!(before <= snapshot.taken_at && snapshot.taken_at <= after);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let mut tracker = tracker();
        tracker.storage.fail_saves = true;

        let result = tracker.start(day("2024-01-01")).await;
        assert!(matches!(result, Err(ProgressError::Storage(_))));
    }
}
