//! BoxCheckpointStore -- object-safe dynamic dispatch wrapper for CheckpointStore.
//!
//! 1. Define an object-safe `CheckpointStoreDyn` trait with boxed futures
//! 2. Blanket-impl `CheckpointStoreDyn` for all `T: CheckpointStore`
//! 3. `BoxCheckpointStore` wraps `Box<dyn CheckpointStoreDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use flowguard_types::checkpoint::Checkpoint;
use flowguard_types::error::StoreError;

use super::store::CheckpointStore;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`CheckpointStore`] with boxed futures.
pub trait CheckpointStoreDyn: Send + Sync {
    fn initialize_boxed(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    fn close_boxed(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    fn save_boxed<'a>(&'a self, checkpoint: &'a Checkpoint) -> BoxFuture<'a, Result<(), StoreError>>;

    fn get_last_boxed<'a>(
        &'a self,
        workflow_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Checkpoint>, StoreError>>;

    fn history_boxed<'a>(
        &'a self,
        workflow_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Checkpoint>, StoreError>>;
}

impl<T: CheckpointStore> CheckpointStoreDyn for T {
    fn initialize_boxed(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(self.initialize())
    }

    fn close_boxed(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(self.close())
    }

    fn save_boxed<'a>(&'a self, checkpoint: &'a Checkpoint) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.save(checkpoint))
    }

    fn get_last_boxed<'a>(
        &'a self,
        workflow_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Checkpoint>, StoreError>> {
        Box::pin(self.get_last(workflow_id))
    }

    fn history_boxed<'a>(
        &'a self,
        workflow_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Checkpoint>, StoreError>> {
        Box::pin(self.history(workflow_id, limit))
    }
}

/// Type-erased checkpoint store for runtime backend selection
/// (SQLite vs in-memory).
pub struct BoxCheckpointStore {
    inner: Box<dyn CheckpointStoreDyn>,
}

impl BoxCheckpointStore {
    pub fn new<T: CheckpointStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.inner.initialize_boxed().await
    }

    pub async fn close(&self) -> Result<(), StoreError> {
        self.inner.close_boxed().await
    }

    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.inner.save_boxed(checkpoint).await
    }

    pub async fn get_last(&self, workflow_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        self.inner.get_last_boxed(workflow_id).await
    }

    pub async fn history(
        &self,
        workflow_id: &str,
        limit: usize,
    ) -> Result<Vec<Checkpoint>, StoreError> {
        self.inner.history_boxed(workflow_id, limit).await
    }
}

impl std::fmt::Debug for BoxCheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxCheckpointStore").finish_non_exhaustive()
    }
}
