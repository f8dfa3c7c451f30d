//! In-memory checkpoint store backed by `DashMap`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use flowguard_core::checkpoint::store::CheckpointStore;
use flowguard_types::checkpoint::Checkpoint;
use flowguard_types::error::StoreError;

struct Record {
    seq: u64,
    checkpoint: Checkpoint,
}

/// Process-local implementation of `CheckpointStore`.
///
/// Records are appended per execution id and never mutated. A global
/// sequence number breaks timestamp ties in insertion order.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    records: DashMap<String, Vec<Record>>,
    next_seq: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of executions with at least one checkpoint.
    pub fn execution_count(&self) -> usize {
        self.records.len()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Checkpoints for `workflow_id`, most recent first.
    fn ordered(&self, workflow_id: &str, limit: usize) -> Vec<Checkpoint> {
        let Some(entry) = self.records.get(workflow_id) else {
            return Vec::new();
        };
        let mut records: Vec<&Record> = entry.iter().collect();
        records.sort_by(|a, b| {
            b.checkpoint
                .timestamp
                .cmp(&a.checkpoint.timestamp)
                .then(b.seq.cmp(&a.seq))
        });
        records
            .into_iter()
            .take(limit)
            .map(|r| r.checkpoint.clone())
            .collect()
    }
}

impl std::fmt::Debug for InMemoryCheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCheckpointStore")
            .field("executions", &self.records.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        self.ensure_open()
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut records = self.records.entry(checkpoint.workflow_id.clone()).or_default();
        // Taken under the entry guard so sequence order matches push order.
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        records.push(Record {
            seq,
            checkpoint: checkpoint.clone(),
        });
        Ok(())
    }

    async fn get_last(&self, workflow_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        self.ensure_open()?;
        Ok(self.ordered(workflow_id, 1).into_iter().next())
    }

    async fn history(&self, workflow_id: &str, limit: usize) -> Result<Vec<Checkpoint>, StoreError> {
        self.ensure_open()?;
        Ok(self.ordered(workflow_id, limit))
    }
}
