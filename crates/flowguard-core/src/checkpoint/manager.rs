//! Checkpoint manager for execution state.
//!
//! Wraps a [`BoxCheckpointStore`] to provide the higher-level writes the
//! adapter performs: the initial checkpoint on submission, the failed
//! checkpoint on a rejected submission, and caller-driven progress
//! checkpoints. Attempt counts only move forward for a given execution.
//!
//! Every write for one execution id runs under that id's lock and derives
//! its attempt count from the last record read under the same lock, so
//! concurrent submissions of one execution cannot interleave a stale read
//! with a newer write.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use flowguard_types::checkpoint::{
    Checkpoint, CheckpointMetadata, CheckpointStatus, START_STEP,
};
use flowguard_types::error::StoreError;
use flowguard_types::retry::RetryPolicy;
use serde_json::Value;
use tokio::sync::Mutex;

use super::box_store::BoxCheckpointStore;

// ---------------------------------------------------------------------------
// CheckpointManager
// ---------------------------------------------------------------------------

/// Writes and reads execution checkpoints through any store backend.
pub struct CheckpointManager {
    store: BoxCheckpointStore,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CheckpointManager {
    pub fn new(store: BoxCheckpointStore) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &BoxCheckpointStore {
        &self.store
    }

    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.store.initialize().await
    }

    pub async fn close(&self) -> Result<(), StoreError> {
        self.store.close().await
    }

    /// The most recent checkpoint for an execution.
    pub async fn last(&self, execution_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        self.store.get_last(execution_id).await
    }

    /// Up to `limit` checkpoints for an execution, most recent first.
    pub async fn history(
        &self,
        execution_id: &str,
        limit: usize,
    ) -> Result<Vec<Checkpoint>, StoreError> {
        self.store.history(execution_id, limit).await
    }

    // -----------------------------------------------------------------------
    // Lifecycle checkpoints
    // -----------------------------------------------------------------------

    /// Record the first checkpoint of a freshly submitted execution.
    ///
    /// Returns `None` without writing when the execution already has a
    /// checkpoint (a resumed execution, or a concurrent attempt that
    /// recorded first).
    pub async fn checkpoint_start(
        &self,
        execution_id: &str,
        data: &Value,
        policy: &RetryPolicy,
    ) -> Result<Option<Checkpoint>, StoreError> {
        self.serialized(execution_id, async {
            if self.store.get_last(execution_id).await?.is_some() {
                tracing::debug!(execution_id, "execution already checkpointed, skipping start");
                return Ok(None);
            }

            let checkpoint = Checkpoint::new(
                execution_id,
                START_STEP,
                CheckpointStatus::InProgress,
                data.clone(),
                CheckpointMetadata {
                    attempt_count: 0,
                    retry_strategy: Some(policy.snapshot(0)),
                    ..Default::default()
                },
            );
            self.store.save(&checkpoint).await?;

            tracing::debug!(
                execution_id,
                checkpoint_id = %checkpoint.id,
                "checkpointed execution start"
            );
            Ok(Some(checkpoint))
        })
        .await
    }

    /// Record a failed submission.
    ///
    /// The step is carried over from the last stored checkpoint and the
    /// attempt count is one past it; without one this is attempt 1 at the
    /// start step. Nothing is written if the last checkpoint cannot be read.
    pub async fn checkpoint_failure(
        &self,
        execution_id: &str,
        data: &Value,
        error: &str,
        policy: &RetryPolicy,
    ) -> Result<Checkpoint, StoreError> {
        self.serialized(execution_id, async {
            let last = self.store.get_last(execution_id).await?;
            let attempt = last.as_ref().map_or(0, |cp| cp.metadata.attempt_count) + 1;
            let step = last.as_ref().map_or(START_STEP, |cp| cp.step.as_str());

            let checkpoint = Checkpoint::new(
                execution_id,
                step,
                CheckpointStatus::Failed,
                data.clone(),
                CheckpointMetadata {
                    attempt_count: attempt,
                    last_error: Some(error.to_string()),
                    retry_strategy: Some(policy.snapshot(attempt)),
                    ..Default::default()
                },
            );
            self.store.save(&checkpoint).await?;

            tracing::debug!(
                execution_id,
                checkpoint_id = %checkpoint.id,
                attempt,
                error,
                "checkpointed execution failure"
            );
            Ok(checkpoint)
        })
        .await
    }

    /// Record caller-reported progress.
    ///
    /// The attempt count is raised to the last stored count if the caller
    /// supplied a lower one.
    pub async fn checkpoint_progress(
        &self,
        execution_id: &str,
        step: &str,
        data: Value,
        mut metadata: CheckpointMetadata,
    ) -> Result<Checkpoint, StoreError> {
        self.serialized(execution_id, async {
            if let Some(last) = self.store.get_last(execution_id).await? {
                metadata.attempt_count = metadata.attempt_count.max(last.metadata.attempt_count);
            }

            let checkpoint = Checkpoint::new(
                execution_id,
                step,
                CheckpointStatus::InProgress,
                data,
                metadata,
            );
            self.store.save(&checkpoint).await?;

            tracing::debug!(
                execution_id,
                step,
                checkpoint_id = %checkpoint.id,
                attempt = checkpoint.metadata.attempt_count,
                "checkpointed execution progress"
            );
            Ok(checkpoint)
        })
        .await
    }

    /// Run `op` holding the lock for `execution_id`.
    ///
    /// The lock entry is dropped once no other task holds or awaits it.
    async fn serialized<T>(&self, execution_id: &str, op: impl Future<Output = T>) -> T {
        let lock = self.locks.entry(execution_id.to_string()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            op.await
        };
        drop(lock);
        // Only the map's reference left means no task holds or awaits it.
        self.locks
            .remove_if(execution_id, |_, held| Arc::strong_count(held) == 1);
        result
    }

    // -----------------------------------------------------------------------
    // Recovery helpers
    // -----------------------------------------------------------------------

    /// Whether an execution can be resumed from this checkpoint.
    ///
    /// Completed executions and executions whose recorded attempts have used
    /// up the retry budget cannot.
    pub fn can_resume(checkpoint: &Checkpoint) -> bool {
        if checkpoint.status == CheckpointStatus::Completed {
            return false;
        }
        !checkpoint
            .metadata
            .retry_strategy
            .as_ref()
            .is_some_and(|strategy| strategy.is_exhausted())
    }
}

impl std::fmt::Debug for CheckpointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointManager")
            .field("locked_executions", &self.locks.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStore;
    use serde_json::json;

    fn manager() -> (CheckpointManager, MockStore) {
        let store = MockStore::default();
        (CheckpointManager::new(BoxCheckpointStore::new(store.clone())), store)
    }

    #[tokio::test]
    async fn start_checkpoint_has_zero_attempts() {
        let (manager, store) = manager();
        let cp = manager
            .checkpoint_start("exec-1", &json!({"table": "users"}), &RetryPolicy::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cp.step, START_STEP);
        assert_eq!(cp.status, CheckpointStatus::InProgress);
        assert_eq!(cp.metadata.attempt_count, 0);
        assert!(cp.metadata.last_error.is_none());
        assert_eq!(store.records("exec-1").len(), 1);
    }

    #[tokio::test]
    async fn start_is_skipped_once_execution_has_a_checkpoint() {
        let (manager, store) = manager();
        manager
            .checkpoint_failure("exec-1", &json!({}), "ECONNRESET", &RetryPolicy::default())
            .await
            .unwrap();

        let started = manager
            .checkpoint_start("exec-1", &json!({}), &RetryPolicy::default())
            .await
            .unwrap();
        assert!(started.is_none());

        let records = store.records("exec-1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, CheckpointStatus::Failed);
    }

    #[tokio::test]
    async fn failure_without_prior_is_first_attempt() {
        let (manager, _store) = manager();
        let cp = manager
            .checkpoint_failure("exec-1", &json!({}), "ECONNREFUSED", &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(cp.status, CheckpointStatus::Failed);
        assert_eq!(cp.step, START_STEP);
        assert_eq!(cp.metadata.attempt_count, 1);
        assert_eq!(cp.metadata.last_error.as_deref(), Some("ECONNREFUSED"));
        assert_eq!(cp.metadata.retry_strategy.unwrap().current_attempt, 1);
    }

    #[tokio::test]
    async fn failure_continues_from_last_checkpoint() {
        let (manager, _store) = manager();
        manager
            .checkpoint_progress("exec-1", "load-tables", json!({}), CheckpointMetadata {
                attempt_count: 2,
                ..Default::default()
            })
            .await
            .unwrap();

        let cp = manager
            .checkpoint_failure("exec-1", &json!({}), "boom", &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(cp.step, "load-tables");
        assert_eq!(cp.metadata.attempt_count, 3);
    }

    #[tokio::test]
    async fn progress_never_lowers_attempt_count() {
        let (manager, _store) = manager();
        manager
            .checkpoint_failure("exec-1", &json!({}), "boom", &RetryPolicy::default())
            .await
            .unwrap();

        let cp = manager
            .checkpoint_progress("exec-1", "step-2", json!({}), CheckpointMetadata::default())
            .await
            .unwrap();
        assert_eq!(cp.metadata.attempt_count, 1);

        let cp = manager
            .checkpoint_progress("exec-1", "step-3", json!({}), CheckpointMetadata {
                attempt_count: 4,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cp.metadata.attempt_count, 4);
    }

    #[tokio::test]
    async fn failure_is_not_written_when_last_checkpoint_is_unreadable() {
        let (manager, store) = manager();
        manager
            .checkpoint_progress("exec-1", "copy-rows", json!({}), CheckpointMetadata {
                attempt_count: 4,
                ..Default::default()
            })
            .await
            .unwrap();

        store.fail_reads(true);
        let err = manager
            .checkpoint_failure("exec-1", &json!({}), "boom", &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
        assert_eq!(store.records("exec-1").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_failures_take_distinct_attempts() {
        let (manager, store) = manager();
        let manager = Arc::new(manager);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let manager = Arc::clone(&manager);
            tasks.spawn(async move {
                manager
                    .checkpoint_failure(
                        "exec-1",
                        &json!({}),
                        &format!("error {i}"),
                        &RetryPolicy::default(),
                    )
                    .await
                    .unwrap()
                    .metadata
                    .attempt_count
            });
        }
        let mut attempts = Vec::new();
        while let Some(attempt) = tasks.join_next().await {
            attempts.push(attempt.unwrap());
        }
        attempts.sort_unstable();

        assert_eq!(attempts, (1..=8).collect::<Vec<u32>>());
        assert_eq!(store.records("exec-1").len(), 8);
        assert_eq!(format!("{manager:?}"), "CheckpointManager { locked_executions: 0, .. }");
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let (manager, store) = manager();
        store.fail_saves(true);
        let err = manager
            .checkpoint_start("exec-1", &json!({}), &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }

    #[test]
    fn can_resume_rules() {
        let policy = RetryPolicy::default();
        let mut cp = Checkpoint::new(
            "exec-1",
            START_STEP,
            CheckpointStatus::Failed,
            json!({}),
            CheckpointMetadata {
                attempt_count: 1,
                retry_strategy: Some(policy.snapshot(1)),
                ..Default::default()
            },
        );
        assert!(CheckpointManager::can_resume(&cp));

        cp.metadata.retry_strategy = Some(policy.snapshot(policy.maximum_attempts));
        assert!(!CheckpointManager::can_resume(&cp));

        cp.metadata.retry_strategy = None;
        assert!(CheckpointManager::can_resume(&cp));

        cp.status = CheckpointStatus::Completed;
        assert!(!CheckpointManager::can_resume(&cp));
    }
}
