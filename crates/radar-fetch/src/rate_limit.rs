//! Per-API quota tracking.
//!
//! Every response carries the provider's remaining request budget and the
//! instant it resets. The [`RateLimiter`] remembers the latest observation per
//! API name and suspends callers when the budget runs low.

use crate::client::HttpResponse;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default remaining-request floor.
pub const DEFAULT_MIN_REMAINING: u32 = 10;

/// Added to every reset wait so the provider's window has rolled over.
const RESET_GRACE: Duration = Duration::from_secs(5);

/// Upper bound for a single quota wait.
const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Header carrying the remaining request count.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Header carrying the reset instant as Unix seconds.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Latest quota observation for one API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    /// API name the quota belongs to
    pub api: String,
    /// Requests left in the current window
    pub remaining: u32,
    /// Absolute instant the window resets, when known
    pub reset_at: Option<DateTime<Utc>>,
    /// When this observation was recorded
    pub updated_at: DateTime<Utc>,
}

impl QuotaState {
    /// How long to wait at `now` before issuing another request, if at all.
    #[must_use]
    pub fn wait_at(&self, min_remaining: u32, now: DateTime<Utc>) -> Option<Duration> {
        if self.remaining >= min_remaining {
            return None;
        }
        let reset_at = self.reset_at?;
        let until_reset = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
        Some((until_reset + RESET_GRACE).min(MAX_WAIT))
    }
}

/// Shared quota tracker keyed by API name.
///
/// Wrap in an `Arc` and hand one instance to every fetcher that talks to the
/// same provider.
#[derive(Debug, Default)]
pub struct RateLimiter {
    quotas: Mutex<HashMap<String, QuotaState>>,
}

impl RateLimiter {
    /// Create an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest quota for `api`, replacing any previous observation.
    pub async fn update(&self, api: &str, remaining: u32, reset_at: Option<DateTime<Utc>>) {
        let state = QuotaState {
            api: api.to_string(),
            remaining,
            reset_at,
            updated_at: Utc::now(),
        };
        self.quotas.lock().await.insert(api.to_string(), state);
    }

    /// Record quota from `x-ratelimit-*` response headers.
    ///
    /// Returns `false` and leaves the state untouched when the response has no
    /// parseable remaining count.
    pub async fn update_from_headers(&self, api: &str, response: &HttpResponse) -> bool {
        let Some(remaining) = response
            .header(REMAINING_HEADER)
            .and_then(|v| v.trim().parse::<u32>().ok())
        else {
            return false;
        };
        let reset_at = response
            .header(RESET_HEADER)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        self.update(api, remaining, reset_at).await;
        true
    }

    /// Snapshot of the current quota for `api`.
    pub async fn state(&self, api: &str) -> Option<QuotaState> {
        self.quotas.lock().await.get(api).cloned()
    }

    /// Whether a request to `api` may proceed now.
    ///
    /// Unknown APIs and stale observations whose reset has passed are allowed.
    pub async fn check(&self, api: &str, min_remaining: u32) -> bool {
        let quotas = self.quotas.lock().await;
        let Some(state) = quotas.get(api) else {
            return true;
        };
        if state.remaining >= min_remaining {
            return true;
        }
        match state.reset_at {
            Some(reset_at) if reset_at > Utc::now() => {
                tracing::warn!(
                    "Rate limit low for {}: {} remaining, resets at {}",
                    api,
                    state.remaining,
                    reset_at
                );
                false
            }
            _ => true,
        }
    }

    /// Delay `wait_if_needed` would apply right now.
    pub async fn wait_duration(&self, api: &str, min_remaining: u32) -> Option<Duration> {
        let quotas = self.quotas.lock().await;
        quotas
            .get(api)
            .and_then(|state| state.wait_at(min_remaining, Utc::now()))
    }

    /// Sleep until the quota for `api` resets when it has dropped below
    /// `min_remaining`. Returns the time slept.
    pub async fn wait_if_needed(&self, api: &str, min_remaining: u32) -> Option<Duration> {
        let wait = self.wait_duration(api, min_remaining).await?;
        tracing::warn!("Rate limited on {}: waiting {:?}", api, wait);
        tokio::time::sleep(wait).await;
        Some(wait)
    }
}
