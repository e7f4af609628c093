//! SQLite completion-flag backend.
//!
//! Keeps one row per (test, device) pair in `completion_status`, written with
//! insert-or-ignore followed by an update. This layout has no daily history
//! table, so it only implements [`CompletionStore`].
//!
//! This is a standalone backend for deployments that keep status flags in a
//! database. It cannot drive a `ProgressTracker`, which needs a
//! [`ProgressStore`](crate::ProgressStore) for the session and history; the
//! `chartrack` binary always uses [`JsonStorage`](crate::JsonStorage).

use async_trait::async_trait;
use chartrack_core::{CellKey, CompletionMatrix};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use std::path::Path;
use tracing::debug;

use super::trait_::{CompletionStore, Result};

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a database at the given connection URL.
    pub async fn new(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Open (or create) a database file.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        Self::new(&format!("sqlite://{}?mode=rwc", path.display())).await
    }

    /// Create an in-memory database for testing.
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS completion_status (
                test_id TEXT NOT NULL,
                device_id TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (test_id, device_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Set one flag: insert the row if missing, then update its status.
    pub async fn set_status(&self, key: &CellKey, done: bool) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO completion_status (test_id, device_id, status) VALUES (?, ?, 0)",
        )
        .bind(key.test.as_str())
        .bind(key.device.as_str())
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE completion_status SET status = ? WHERE test_id = ? AND device_id = ?")
            .bind(done)
            .bind(key.test.as_str())
            .bind(key.device.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl CompletionStore for SqliteStorage {
    async fn load_matrix(&self) -> Result<CompletionMatrix> {
        let rows = sqlx::query("SELECT test_id, device_id, status FROM completion_status")
            .fetch_all(&self.pool)
            .await?;

        let mut matrix = CompletionMatrix::new();
        for row in rows {
            let test: String = row.try_get("test_id")?;
            let device: String = row.try_get("device_id")?;
            let done: bool = row.try_get("status")?;
            matrix.set(CellKey::new(test, device), done);
        }

        debug!("Loaded {} checked cells", matrix.checked_count());
        Ok(matrix)
    }

    async fn save_matrix(&mut self, matrix: &CompletionMatrix) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE completion_status SET status = 0")
            .execute(&mut *tx)
            .await?;

        for (key, done) in matrix.iter() {
            sqlx::query(
                "INSERT OR IGNORE INTO completion_status (test_id, device_id, status) VALUES (?, ?, 0)",
            )
            .bind(key.test.as_str())
            .bind(key.device.as_str())
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE completion_status SET status = ? WHERE test_id = ? AND device_id = ?")
                .bind(done)
                .bind(key.test.as_str())
                .bind(key.device.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn reset_matrix(&mut self) -> Result<()> {
        let result = sqlx::query("UPDATE completion_status SET status = 0")
            .execute(&self.pool)
            .await?;
        debug!("Reset {} status flags", result.rows_affected());
        Ok(())
    }
}
