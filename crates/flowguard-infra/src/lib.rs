//! Infrastructure layer for flowguard.
//!
//! Contains implementations of the ports defined in `flowguard-core`: SQLite
//! and in-memory checkpoint stores, the HTTP execution engine client, the
//! configuration loader, and the wiring that assembles an adapter from
//! configuration.

pub mod config;
pub mod engine;
pub mod memory;
pub mod sqlite;
pub mod wiring;
