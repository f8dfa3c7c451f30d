//! Checkpoint persistence: the store port, its type-erased wrapper, and the
//! manager that writes checkpoints on behalf of the adapter.

pub mod box_store;
pub mod manager;
pub mod store;

pub use box_store::BoxCheckpointStore;
pub use manager::CheckpointManager;
pub use store::CheckpointStore;
