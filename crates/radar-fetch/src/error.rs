//! Error types for fetching.

use thiserror::Error;

/// Errors that can occur while talking to a remote API.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request never produced a response (DNS, TLS, timeout)
    #[error("transport error for {path}: {message}")]
    Transport {
        /// Requested path or URL
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Remote answered with a non-success status
    #[error("HTTP {status} from {path}")]
    Status {
        /// Requested path or URL
        path: String,
        /// HTTP status code
        status: u16,
    },

    /// Secondary rate limit persisted after the cooldown retries
    #[error("rate limited on {path} after {retries} cooldown retries")]
    RateLimited {
        /// Requested path or URL
        path: String,
        /// Number of cooldown retries attempted
        retries: u32,
    },

    /// Response body was not the expected JSON shape
    #[error("failed to decode response from {path}: {message}")]
    Decode {
        /// Requested path or URL
        path: String,
        /// What went wrong
        message: String,
    },

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether the error was caused by quota exhaustion.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
