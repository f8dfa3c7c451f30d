//! In-process storage.
//!
//! Checkpoint persistence that lives only as long as the process. Useful
//! for single-run tools and for wiring an adapter without a database.

pub mod checkpoint;
