//! Database connection management.
//!
//! File databases run in WAL mode with a busy timeout so concurrent collectors
//! can write without failing on lock contention. `:memory:` databases share a
//! single pooled connection.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Maximum pooled connections for file databases.
const MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a connection pool for the database at `path`.
///
/// # Errors
/// Returns `DatabaseError::Open` if the path is not valid UTF-8 or the
/// database cannot be opened, and `DatabaseError::Io` if the parent directory
/// cannot be created.
pub async fn connect(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path = path.as_ref();
    let path_str = path
        .to_str()
        .ok_or_else(|| DatabaseError::Open("invalid database path: not valid UTF-8".to_string()))?;

    if path_str == ":memory:" {
        let options = SqliteConnectOptions::from_str(path_str)
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Open(e.to_string()))?;

        tracing::debug!("In-memory database pool created");
        return Ok(pool);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Open(e.to_string()))?;

    tracing::info!("Database pool created at {}", path_str);
    Ok(pool)
}
