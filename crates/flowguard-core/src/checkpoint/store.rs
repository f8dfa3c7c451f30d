//! Checkpoint store trait definition.
//!
//! Defines the storage interface for execution checkpoints. The
//! infrastructure layer (flowguard-infra) implements this trait with SQLite
//! and in-memory persistence.

use flowguard_types::checkpoint::Checkpoint;
use flowguard_types::error::StoreError;

/// Append-only persistence of execution checkpoints keyed by execution id.
///
/// `save` never mutates an existing record. Ordering among records for one
/// execution is by timestamp, ties broken by insertion order.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait CheckpointStore: Send + Sync {
    /// Prepare the backing storage (create tables, open pools).
    fn initialize(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Release the backing storage. Later calls fail with `StoreError::Closed`.
    fn close(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Append a checkpoint.
    fn save(
        &self,
        checkpoint: &Checkpoint,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// The checkpoint with the greatest timestamp for `workflow_id`.
    fn get_last(
        &self,
        workflow_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Checkpoint>, StoreError>> + Send;

    /// Up to `limit` checkpoints for `workflow_id`, most recent first.
    fn history(
        &self,
        workflow_id: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Checkpoint>, StoreError>> + Send;
}
