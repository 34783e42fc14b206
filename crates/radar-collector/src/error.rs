//! Error types for collectors.

use radar_db::DatabaseError;
use radar_fetch::FetchError;
use thiserror::Error;

/// Errors that can end collection of a single target.
#[derive(Error, Debug)]
pub enum CollectError {
    /// Remote API failure
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Storage failure
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Target does not exist upstream
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What was looked up (user, package, repository)
        kind: &'static str,
        /// Requested name
        name: String,
    },

    /// Collector invoked without the configuration it needs
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

impl CollectError {
    /// Whether the failure came from quota exhaustion.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_rate_limited())
    }
}

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, CollectError>;
