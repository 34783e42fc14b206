//! Radar Database Layer
//!
//! Provides `SQLite` storage for metric snapshots, scored issues, vulnerability
//! findings and the audit trail. Uses `SQLx` with embedded migrations.
//!
//! # Architecture
//!
//! - **Snapshots**: one row per natural key per day, replaced on re-collection
//! - **Issues**: keyed by repository and number, refreshed on re-discovery
//! - **Findings**: keyed by location and type, first discovery kept
//! - **Audit log**: append-only scan and collection entries
//!
//! # Example
//!
//! ```ignore
//! use radar_db::{Database, RecordKind, SnapshotQuery};
//!
//! let db = Database::new("radar.db").await?;
//! db.run_migrations().await?;
//! let store = db.store();
//! let history = store
//!     .query(&SnapshotQuery::new(RecordKind::Profile).key("octocat"))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod audit_log;
pub mod connection;
pub mod error;
pub mod findings;
pub mod issues;
pub mod migrations;
pub mod snapshots;
pub mod store;

// Re-export commonly used types
pub use audit_log::{CollectionLogEntry, ScanLogEntry};
pub use error::{DatabaseError, Result};
pub use snapshots::{ContributionSnapshot, PackageSnapshot, ProfileSnapshot, RepositorySnapshot};
pub use store::{
    format_day, ConflictPolicy, RecordKind, SaveOutcome, SnapshotQuery, SnapshotStore,
    StoredRecord,
};

use sqlx::{Pool, Sqlite};
use std::path::Path;

/// High-level database handle owning the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (or create) the database at `path`; `:memory:` gives a private
    /// in-memory database.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::connect(path).await?;
        Ok(Self { pool })
    }

    /// Run all pending database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Number of the latest applied migration.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Snapshot store sharing this database's pool.
    #[must_use]
    pub fn store(&self) -> SnapshotStore {
        SnapshotStore::new(self.pool.clone())
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
