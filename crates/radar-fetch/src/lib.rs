//! Radar Fetch - rate-aware access to paginated REST APIs.
//!
//! # Modules
//!
//! - [`client`] - [`HttpClient`] trait and the `reqwest` implementation
//! - [`rate_limit`] - Per-API quota tracking with reset waits
//! - [`paginate`] - Sequential page walking with cooldowns and partial results
//!
//! # Example
//!
//! ```ignore
//! use radar_fetch::{PageOptions, PaginatedFetcher, RateLimiter, ReqwestClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let client = ReqwestClient::new("https://api.github.com", None, Duration::from_secs(30))?;
//! let fetcher = PaginatedFetcher::new(Arc::new(client), Arc::new(RateLimiter::new()), "github");
//! let outcome = fetcher
//!     .collect_all("/users/octocat/repos", &[], PageOptions::per_page(100))
//!     .await;
//! println!("{} repositories", outcome.records.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod error;
pub mod paginate;
pub mod rate_limit;

pub use client::{HttpClient, HttpResponse, ReqwestClient};
pub use error::{FetchError, Result};
pub use paginate::{FetchOutcome, FetchPolicy, PageOptions, PaginatedFetcher, StopPredicate};
pub use rate_limit::{QuotaState, RateLimiter, DEFAULT_MIN_REMAINING};

/// Build a query parameter list from string pairs.
#[must_use]
pub fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
