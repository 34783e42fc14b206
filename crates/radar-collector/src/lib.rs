//! Radar Collector - GitHub and PyPI collection jobs.
//!
//! Three collectors share one set of rate-aware fetchers and one snapshot
//! store:
//!
//! - [`MetricsCollector`] - daily profile, contribution, repository and
//!   package snapshots
//! - [`IssueRadar`] - scored open issues across curated repositories
//! - [`VulnScanner`] - regex vulnerability findings in repository sources
//!
//! A failing target never aborts a batch. Each target ends in a
//! [`TargetReport`] and an audit log entry.
//!
//! # Example
//!
//! ```rust,ignore
//! use radar_collector::{Fetchers, MetricsCollector};
//! use radar_fetch::RateLimiter;
//! use std::sync::Arc;
//!
//! let fetchers = Fetchers::from_config(&config, Arc::new(RateLimiter::new()))?;
//! let collector = MetricsCollector::new(fetchers, db.store(), &config);
//! let summary = collector.collect_all().await;
//! println!("run {}: {} failed targets", summary.run_id, summary.failed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
#[allow(missing_docs)]
pub mod github;
pub mod issue_radar;
pub mod metrics;
pub mod outcome;
#[allow(missing_docs)]
pub mod pypi;
pub mod vuln_scan;

// Re-export commonly used types
pub use error::{CollectError, Result};
pub use issue_radar::IssueRadar;
pub use metrics::{CollectionSummary, MetricsCollector};
pub use outcome::{TargetReport, TargetStatus};
pub use vuln_scan::{ScanResult, VulnScanner};

use radar_core::{AppConfig, GithubConfig};
use radar_fetch::{FetchPolicy, HttpClient, PaginatedFetcher, RateLimiter, ReqwestClient};
use std::sync::Arc;
use std::time::Duration;

/// Quota key for the GitHub REST API.
pub const GITHUB_API: &str = "github";
/// Quota key for the PyPI JSON API.
pub const PYPI_API: &str = "pypi";
/// Quota key for pypistats.
pub const PYPI_STATS_API: &str = "pypistats";

const GITHUB_HEADERS: &[(&str, &str)] = &[
    ("accept", "application/vnd.github+json"),
    ("x-github-api-version", "2022-11-28"),
];

/// Request policy derived from the GitHub settings.
#[must_use]
pub fn fetch_policy(github: &GithubConfig) -> FetchPolicy {
    FetchPolicy {
        min_remaining: github.min_remaining,
        inter_page_delay: Duration::from_millis(github.inter_page_delay_ms),
        rate_limit_cooldown: Duration::from_secs(github.rate_limit_cooldown_secs),
        ..FetchPolicy::default()
    }
}

/// One fetcher per upstream API, all sharing a quota tracker.
#[derive(Clone)]
pub struct Fetchers {
    /// GitHub REST API
    pub github: PaginatedFetcher,
    /// PyPI JSON API
    pub pypi: PaginatedFetcher,
    /// pypistats download counts
    pub pypi_stats: PaginatedFetcher,
}

impl Fetchers {
    /// Wrap already-built clients.
    #[must_use]
    pub fn new(
        github: Arc<dyn HttpClient>,
        pypi: Arc<dyn HttpClient>,
        pypi_stats: Arc<dyn HttpClient>,
        limiter: Arc<RateLimiter>,
        policy: &FetchPolicy,
    ) -> Self {
        Self {
            github: PaginatedFetcher::new(github, limiter.clone(), GITHUB_API)
                .with_policy(policy.clone()),
            pypi: PaginatedFetcher::new(pypi, limiter.clone(), PYPI_API).with_policy(policy.clone()),
            pypi_stats: PaginatedFetcher::new(pypi_stats, limiter, PYPI_STATS_API)
                .with_policy(policy.clone()),
        }
    }

    /// Build `reqwest` clients for the configured endpoints.
    pub fn from_config(config: &AppConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let timeout = Duration::from_secs(config.github.timeout_secs);
        let github = ReqwestClient::with_headers(
            config.github.api_url.clone(),
            config.github.token.as_deref(),
            timeout,
            GITHUB_HEADERS,
        )?;
        let pypi = ReqwestClient::new(config.pypi.json_api_url.clone(), None, timeout)?;
        let pypi_stats = ReqwestClient::new(config.pypi.stats_api_url.clone(), None, timeout)?;

        Ok(Self::new(
            Arc::new(github),
            Arc::new(pypi),
            Arc::new(pypi_stats),
            limiter,
            &fetch_policy(&config.github),
        ))
    }
}
