//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. This module provides a `DatabasePool`
//! with a multi-connection reader pool for concurrent reads and a single-connection
//! writer pool for serialized writes. Both use WAL journal mode.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Environment variable naming the flowguard data directory.
pub const DATA_DIR_ENV: &str = "FLOWGUARD_DATA_DIR";

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: Multi-connection pool (up to 8) for concurrent SELECT queries.
/// - `writer`: Single-connection pool for serialized INSERTs.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Create a new DatabasePool with split reader/writer connections.
    ///
    /// Runs migrations automatically on the writer pool.
    /// Both pools use WAL journal mode and a 5-second busy timeout.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // Run migrations on writer before opening reader pool
        Self::migrate(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }

    /// Apply pending migrations. Already-applied migrations are skipped.
    pub async fn migrate(writer: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("../../migrations").run(writer).await?;
        Ok(())
    }

    /// Close both pools. Queries issued afterwards fail with `PoolClosed`.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }
}

/// Returns the default database URL based on `FLOWGUARD_DATA_DIR`,
/// falling back to `~/.flowguard/checkpoints.db`.
pub fn default_database_url() -> String {
    let data_dir = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.flowguard")
    });
    format!("sqlite://{data_dir}/checkpoints.db")
}
