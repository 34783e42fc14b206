//! Sequential page walking over list and search endpoints.
//!
//! Pages are requested one at a time (`page=1,2,…`). Each request waits on the
//! shared [`RateLimiter`] first and feeds the response headers back into it
//! afterwards. A walk ends on the first empty page, non-success status, page
//! cap or stop predicate hit.

use crate::client::{HttpClient, HttpResponse};
use crate::error::{FetchError, Result};
use crate::rate_limit::{RateLimiter, DEFAULT_MIN_REMAINING};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Smallest delay allowed between consecutive page requests.
pub const MIN_INTER_PAGE_DELAY: Duration = Duration::from_millis(250);

/// Cooldown applied after a secondary rate limit response.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Predicate over a page's records; returning `true` ends the walk after that page.
pub type StopPredicate = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Fetcher-wide request policy.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Remaining-quota floor passed to the limiter
    pub min_remaining: u32,
    /// Delay between consecutive pages, clamped to [`MIN_INTER_PAGE_DELAY`]
    pub inter_page_delay: Duration,
    /// Sleep after a 403/429 before retrying the same request
    pub rate_limit_cooldown: Duration,
    /// Retries of one request after a 403/429
    pub max_rate_limit_retries: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            min_remaining: DEFAULT_MIN_REMAINING,
            inter_page_delay: MIN_INTER_PAGE_DELAY,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            max_rate_limit_retries: 1,
        }
    }
}

/// Per-walk options.
#[derive(Clone)]
pub struct PageOptions {
    /// Records requested per page
    pub per_page: u32,
    /// Last page to request, inclusive
    pub max_pages: Option<u32>,
    /// Ends the walk after the first page it returns `true` for
    pub stop_when: Option<StopPredicate>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            per_page: 100,
            max_pages: None,
            stop_when: None,
        }
    }
}

impl PageOptions {
    /// Options with the given page size and no cap.
    #[must_use]
    pub fn per_page(per_page: u32) -> Self {
        Self {
            per_page,
            ..Self::default()
        }
    }

    /// Stop after `max_pages` pages.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Stop after the first page matching `predicate`.
    #[must_use]
    pub fn with_stop_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.stop_when = Some(Arc::new(predicate));
        self
    }
}

/// Records gathered by [`PaginatedFetcher::collect_all`].
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Records from every page fetched before the walk ended
    pub records: Vec<Value>,
    /// Pages that returned records
    pub pages: u32,
    /// Error that cut the walk short, if any
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    /// Whether the walk ran to a natural end.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Rate-aware fetcher bound to one API.
#[derive(Clone)]
pub struct PaginatedFetcher {
    client: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
    api: String,
    policy: FetchPolicy,
}

impl PaginatedFetcher {
    /// Create a fetcher for `api` using the default policy.
    #[must_use]
    pub fn new(client: Arc<dyn HttpClient>, limiter: Arc<RateLimiter>, api: impl Into<String>) -> Self {
        Self {
            client,
            limiter,
            api: api.into(),
            policy: FetchPolicy::default(),
        }
    }

    /// Replace the request policy.
    #[must_use]
    pub fn with_policy(mut self, mut policy: FetchPolicy) -> Self {
        policy.inter_page_delay = policy.inter_page_delay.max(MIN_INTER_PAGE_DELAY);
        self.policy = policy;
        self
    }

    /// API name used for quota tracking.
    #[must_use]
    pub fn api(&self) -> &str {
        &self.api
    }

    /// Shared quota tracker.
    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Active request policy.
    #[must_use]
    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Single rate-gated request with the cooldown policy applied.
    ///
    /// Non-success statuses other than 403/429 are returned as responses.
    pub async fn fetch_one(&self, path: &str, params: &[(String, String)]) -> Result<HttpResponse> {
        request(
            self.client.as_ref(),
            &self.limiter,
            &self.api,
            &self.policy,
            path,
            params,
        )
        .await
    }

    /// Single request decoded as JSON, treating non-success statuses as errors.
    pub async fn fetch_json(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let response = self.fetch_one(path, params).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: response.status,
            });
        }
        response.json(path)
    }

    /// Lazily walk every page of `path`, yielding records in page order.
    ///
    /// An error ends the stream after the records already fetched; it is the
    /// last item yielded.
    pub fn fetch_all(
        &self,
        path: &str,
        params: &[(String, String)],
        options: PageOptions,
    ) -> BoxStream<'static, Result<Value>> {
        let pager = Pager::new(self.clone(), path, params, options);
        let state = (pager, VecDeque::new(), false);

        stream::unfold(state, |(mut pager, mut buffer, mut done)| async move {
            loop {
                if let Some(record) = buffer.pop_front() {
                    return Some((Ok(record), (pager, buffer, done)));
                }
                if done {
                    return None;
                }
                match pager.next_page().await {
                    Ok(Some(records)) => buffer.extend(records),
                    Ok(None) => done = true,
                    Err(e) => {
                        done = true;
                        return Some((Err(e), (pager, buffer, done)));
                    }
                }
            }
        })
        .boxed()
    }

    /// Walk every page of `path` and gather the records.
    ///
    /// Never fails: a page error is logged and returned alongside the records
    /// gathered so far.
    pub async fn collect_all(
        &self,
        path: &str,
        params: &[(String, String)],
        options: PageOptions,
    ) -> FetchOutcome {
        let mut pager = Pager::new(self.clone(), path, params, options);
        let mut outcome = FetchOutcome::default();

        loop {
            match pager.next_page().await {
                Ok(Some(records)) => {
                    outcome.pages += 1;
                    outcome.records.extend(records);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(
                        "Pagination of {} stopped after {} pages: {}",
                        path,
                        outcome.pages,
                        e
                    );
                    outcome.error = Some(e);
                    break;
                }
            }
        }

        outcome
    }
}

/// Cursor over the pages of one endpoint.
struct Pager {
    fetcher: PaginatedFetcher,
    path: String,
    params: Vec<(String, String)>,
    options: PageOptions,
    page: u32,
    finished: bool,
}

impl Pager {
    fn new(
        fetcher: PaginatedFetcher,
        path: &str,
        params: &[(String, String)],
        options: PageOptions,
    ) -> Self {
        Self {
            fetcher,
            path: path.to_string(),
            params: params.to_vec(),
            options,
            page: 0,
            finished: false,
        }
    }

    /// Fetch the next page. `Ok(None)` means the walk is over.
    async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        if self.finished {
            return Ok(None);
        }
        if self
            .options
            .max_pages
            .is_some_and(|max| self.page >= max)
        {
            tracing::debug!("Page cap reached for {}", self.path);
            self.finished = true;
            return Ok(None);
        }

        if self.page > 0 {
            tokio::time::sleep(self.fetcher.policy.inter_page_delay).await;
        }
        self.page += 1;

        let mut params = self.params.clone();
        params.push(("per_page".to_string(), self.options.per_page.to_string()));
        params.push(("page".to_string(), self.page.to_string()));

        let response = match self.fetcher.fetch_one(&self.path, &params).await {
            Ok(response) => response,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        if !response.is_success() {
            self.finished = true;
            return Err(FetchError::Status {
                path: self.path.clone(),
                status: response.status,
            });
        }

        let records = match page_records(&self.path, &response) {
            Ok(records) => records,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        tracing::debug!(
            "Fetched page {} of {} ({} records)",
            self.page,
            self.path,
            records.len()
        );

        if records.is_empty() {
            self.finished = true;
            return Ok(None);
        }
        if let Some(stop) = &self.options.stop_when {
            if stop(&records) {
                self.finished = true;
            }
        }

        Ok(Some(records))
    }
}

/// Issue one request, sleeping out secondary rate limits.
async fn request(
    client: &dyn HttpClient,
    limiter: &RateLimiter,
    api: &str,
    policy: &FetchPolicy,
    path: &str,
    params: &[(String, String)],
) -> Result<HttpResponse> {
    let mut retries = 0;

    loop {
        limiter.wait_if_needed(api, policy.min_remaining).await;

        let response = client.get(path, params).await?;
        limiter.update_from_headers(api, &response).await;

        if !response.is_rate_limited() {
            return Ok(response);
        }
        if retries >= policy.max_rate_limit_retries {
            tracing::error!("Rate limit persisted on {} after {} retries", path, retries);
            return Err(FetchError::RateLimited {
                path: path.to_string(),
                retries,
            });
        }

        retries += 1;
        tracing::warn!(
            "HTTP {} on {}, cooling down for {:?}",
            response.status,
            path,
            policy.rate_limit_cooldown
        );
        tokio::time::sleep(policy.rate_limit_cooldown).await;
    }
}

/// Extract the records of a page body: a bare array or a search `items` array.
fn page_records(path: &str, response: &HttpResponse) -> Result<Vec<Value>> {
    match response.json::<Value>(path)? {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(FetchError::Decode {
                path: path.to_string(),
                message: "expected an array or an object with an `items` array".to_string(),
            }),
        },
        _ => Err(FetchError::Decode {
            path: path.to_string(),
            message: "expected an array or an object with an `items` array".to_string(),
        }),
    }
}
