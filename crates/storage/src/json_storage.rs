//! JSON file storage implementation.
//!
//! Stores the progress record and the completion matrix as two JSON documents
//! in a `.chartrack` directory. Every save rewrites the whole document through
//! a temp file and a rename, so readers never observe a half-written file.

use std::path::{Path, PathBuf};

use chartrack_core::{CompletionMatrix, ProgressRecord};
use serde::{de::DeserializeOwned, Serialize};
use super::{CompletionStore, ProgressStore, Result};
use tokio::fs;
use tracing::{debug, warn};

const PROGRESS_FILE: &str = "progress.json";
const MATRIX_FILE: &str = "completion.json";

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn progress_path(&self) -> PathBuf {
        self.root.join(PROGRESS_FILE)
    }

    fn matrix_path(&self) -> PathBuf {
        self.root.join(MATRIX_FILE)
    }
}

#[async_trait::async_trait]
impl ProgressStore for JsonStorage {
    async fn load_progress(&self) -> Result<ProgressRecord> {
        let record = read_json(&self.progress_path()).await?.unwrap_or_default();
        Ok(record)
    }

    async fn save_progress(&mut self, record: &ProgressRecord) -> Result<()> {
        write_json(&self.progress_path(), record).await
    }
}

#[async_trait::async_trait]
impl CompletionStore for JsonStorage {
    async fn load_matrix(&self) -> Result<CompletionMatrix> {
        let matrix = read_json(&self.matrix_path()).await?.unwrap_or_default();
        Ok(matrix)
    }

    async fn save_matrix(&mut self, matrix: &CompletionMatrix) -> Result<()> {
        write_json(&self.matrix_path(), matrix).await
    }

    async fn reset_matrix(&mut self) -> Result<()> {
        self.save_matrix(&CompletionMatrix::new()).await
    }
}

/// Read a JSON document.
///
/// Missing files yield `None`. Unparseable files also yield `None` after being
/// moved aside to a unique `<name>.corrupt.<timestamp>` file, so neither the
/// next save nor a later corruption can clobber them.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let json = match fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No record at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&json) {
        Ok(value) => {
            debug!("Loaded {}", path.display());
            Ok(Some(value))
        }
        Err(e) => {
            warn!("Ignoring corrupt record {} ({})", path.display(), e);
            quarantine(path).await;
            Ok(None)
        }
    }
}

/// Move a corrupt document out of the way. Failure is logged, not returned:
/// the record is treated as absent either way.
async fn quarantine(path: &Path) {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.f").to_string();
    let mut aside = sibling(path, &format!("corrupt.{stamp}"));
    let mut n = 1;
    while fs::try_exists(&aside).await.unwrap_or(false) {
        aside = sibling(path, &format!("corrupt.{stamp}.{n}"));
        n += 1;
    }

    match fs::rename(path, &aside).await {
        Ok(()) => warn!("Moved corrupt record to {}", aside.display()),
        Err(e) => warn!("Could not move corrupt record {} aside: {}", path.display(), e),
    }
}

/// Replace a JSON document atomically: write a temp file, then rename it over
/// the target.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let temp = sibling(path, "tmp");

    fs::write(&temp, json.as_bytes()).await?;
    fs::rename(&temp, path).await?;

    debug!("Saved {}", path.display());
    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("record");
    path.with_file_name(format!("{name}.{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartrack_core::{CellKey, Date};

    fn day(s: &str) -> Date {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_missing_records_load_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().join("store")).await.unwrap();

        assert_eq!(storage.load_progress().await.unwrap(), ProgressRecord::default());
        assert_eq!(storage.load_matrix().await.unwrap(), CompletionMatrix::new());
        assert!(storage.root().is_dir());
    }

    #[tokio::test]
    async fn test_progress_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut record = ProgressRecord::default();
        record.start(day("2024-01-01"));
        record.record_daily(day("2024-01-01"), 62.5).unwrap();
        storage.save_progress(&record).await.unwrap();

        let loaded = storage.load_progress().await.unwrap();
        assert_eq!(loaded, record);
        assert!(!dir.path().join("progress.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_of_load_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut record = ProgressRecord::default();
        record.start(day("2024-03-04"));
        record.record_daily(day("2024-03-04"), 12.195121951219512).unwrap();
        storage.save_progress(&record).await.unwrap();
        let before = std::fs::read_to_string(dir.path().join("progress.json")).unwrap();

        let loaded = storage.load_progress().await.unwrap();
        storage.save_progress(&loaded).await.unwrap();
        let after = std::fs::read_to_string(dir.path().join("progress.json")).unwrap();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_matrix_save_load_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut matrix = CompletionMatrix::new();
        matrix.set(CellKey::new("DEAD_TIME", "DUT1"), true);
        matrix.set(CellKey::new("EFFICIENCY", "DUT3"), true);
        storage.save_matrix(&matrix).await.unwrap();

        let loaded = storage.load_matrix().await.unwrap();
        assert!(loaded.is_done(&CellKey::new("EFFICIENCY", "DUT3")));
        assert_eq!(loaded.checked_count(), 2);

        storage.reset_matrix().await.unwrap();
        assert_eq!(storage.load_matrix().await.unwrap().checked_count(), 0);
    }

    fn quarantined(dir: &Path, name: &str) -> Vec<String> {
        let prefix = format!("{name}.corrupt.");
        let mut contents: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .map(|path| std::fs::read_to_string(path).unwrap())
            .collect();
        contents.sort();
        contents
    }

    #[tokio::test]
    async fn test_corrupt_record_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("progress.json"), "{\"start_date\": \"2024-").unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        let record = storage.load_progress().await.unwrap();
        assert_eq!(record, ProgressRecord::default());
        assert!(!dir.path().join("progress.json").exists());
        assert_eq!(quarantined(dir.path(), "progress.json"), vec!["{\"start_date\": \"2024-"]);
    }

    #[tokio::test]
    async fn test_repeated_corruption_keeps_every_copy() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let path = dir.path().join("progress.json");

        std::fs::write(&path, "first broken").unwrap();
        assert_eq!(storage.load_progress().await.unwrap(), ProgressRecord::default());

        let mut record = ProgressRecord::default();
        record.start(day("2024-01-01"));
        storage.save_progress(&record).await.unwrap();

        std::fs::write(&path, "second broken").unwrap();
        assert_eq!(storage.load_progress().await.unwrap(), ProgressRecord::default());

        assert_eq!(
            quarantined(dir.path(), "progress.json"),
            vec!["first broken", "second broken"]
        );
    }

    #[tokio::test]
    async fn test_corrupt_matrix_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("completion.json"), r#"[{"test":"A","device":1}]"#).unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        assert_eq!(storage.load_matrix().await.unwrap(), CompletionMatrix::new());
        assert!(!dir.path().join("completion.json").exists());
        assert_eq!(quarantined(dir.path(), "completion.json").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_quarantine_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing to rename: the move fails and is only logged
        quarantine(&dir.path().join("progress.json")).await;
        assert!(quarantined(dir.path(), "progress.json").is_empty());
    }
}
