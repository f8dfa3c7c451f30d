//! SQLite checkpoint store implementation.
//!
//! Implements `CheckpointStore` from `flowguard-core`. Rows are insert-only;
//! `data` and `metadata` are stored as JSON text and timestamps as
//! microseconds since the epoch so that ordering is numeric.

use chrono::{DateTime, Utc};
use flowguard_core::checkpoint::store::CheckpointStore;
use flowguard_types::checkpoint::{Checkpoint, CheckpointMetadata, CheckpointStatus};
use flowguard_types::error::StoreError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CheckpointStore`.
pub struct SqliteCheckpointStore {
    pool: DatabasePool,
}

impl SqliteCheckpointStore {
    /// Create a new checkpoint store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = DatabasePool::new(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

impl std::fmt::Debug for SqliteCheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointStore")
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct CheckpointRow {
    id: String,
    workflow_id: String,
    timestamp_us: i64,
    step: String,
    status: String,
    data: String,
    metadata: String,
}

impl CheckpointRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            timestamp_us: row.try_get("timestamp_us")?,
            step: row.try_get("step")?,
            status: row.try_get("status")?,
            data: row.try_get("data")?,
            metadata: row.try_get("metadata")?,
        })
    }

    fn into_checkpoint(self) -> Result<Checkpoint, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Serialization(format!("invalid checkpoint id: {e}")))?;
        let timestamp = DateTime::<Utc>::from_timestamp_micros(self.timestamp_us).ok_or_else(|| {
            StoreError::Serialization(format!("invalid timestamp: {}", self.timestamp_us))
        })?;
        let status: CheckpointStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::Serialization(format!("invalid status: {e}")))?;
        let data: serde_json::Value = serde_json::from_str(&self.data)
            .map_err(|e| StoreError::Serialization(format!("invalid JSON data: {e}")))?;
        let metadata: CheckpointMetadata = serde_json::from_str(&self.metadata)
            .map_err(|e| StoreError::Serialization(format!("invalid JSON metadata: {e}")))?;

        Ok(Checkpoint {
            id,
            workflow_id: self.workflow_id,
            timestamp,
            step: self.step,
            status,
            data,
            metadata,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn query_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolClosed => StoreError::Closed,
        other => StoreError::Query(other.to_string()),
    }
}

fn rows_into_checkpoints(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Checkpoint>, StoreError> {
    rows.iter()
        .map(|row| {
            CheckpointRow::from_row(row)
                .map_err(query_error)?
                .into_checkpoint()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CheckpointStore implementation
// ---------------------------------------------------------------------------

impl CheckpointStore for SqliteCheckpointStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        DatabasePool::migrate(&self.pool.writer)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        tracing::debug!("sqlite checkpoint store ready");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        tracing::debug!("sqlite checkpoint store closed");
        Ok(())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let data = serde_json::to_string(&checkpoint.data)
            .map_err(|e| StoreError::Serialization(format!("failed to serialize data: {e}")))?;
        let metadata = serde_json::to_string(&checkpoint.metadata)
            .map_err(|e| StoreError::Serialization(format!("failed to serialize metadata: {e}")))?;

        sqlx::query(
            r#"INSERT INTO checkpoints (id, workflow_id, timestamp_us, step, status, data, metadata)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(checkpoint.id.to_string())
        .bind(&checkpoint.workflow_id)
        .bind(checkpoint.timestamp.timestamp_micros())
        .bind(&checkpoint.step)
        .bind(checkpoint.status.as_str())
        .bind(&data)
        .bind(&metadata)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn get_last(&self, workflow_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        let row = sqlx::query(
            r#"SELECT id, workflow_id, timestamp_us, step, status, data, metadata
               FROM checkpoints
               WHERE workflow_id = ?
               ORDER BY timestamp_us DESC, seq DESC
               LIMIT 1"#,
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        match row {
            Some(row) => {
                let row = CheckpointRow::from_row(&row).map_err(query_error)?;
                Ok(Some(row.into_checkpoint()?))
            }
            None => Ok(None),
        }
    }

    async fn history(&self, workflow_id: &str, limit: usize) -> Result<Vec<Checkpoint>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"SELECT id, workflow_id, timestamp_us, step, status, data, metadata
               FROM checkpoints
               WHERE workflow_id = ?
               ORDER BY timestamp_us DESC, seq DESC
               LIMIT ?"#,
        )
        .bind(workflow_id)
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows_into_checkpoints(&rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
