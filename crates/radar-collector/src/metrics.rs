//! Daily account, repository and package metrics.
//!
//! Every collection ends in one snapshot per target per day (re-running on the
//! same day replaces it) and one collection log entry tagged with the run id.

use crate::error::{CollectError, Result};
use crate::github::{self, Event, RepoTotals, Repository, SearchResults, User};
use crate::outcome::{TargetReport, TargetStatus};
use crate::pypi::{self, PackageDocument, RecentDownloads, RecentDownloadsDocument};
use crate::Fetchers;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use radar_core::{AppConfig, MetricType};
use radar_db::{ContributionSnapshot, SnapshotStore, StoredRecord};
use radar_fetch::{params, FetchError, PageOptions, PaginatedFetcher};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Page size of the merged pull request search used for distinct repositories.
const CONTRIBUTED_SEARCH_PER_PAGE: &str = "100";

/// Outcome of one [`MetricsCollector::collect_all`] cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    /// Identifier shared by every collection log entry of the cycle
    pub run_id: String,
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// When the cycle finished
    pub finished_at: DateTime<Utc>,
    /// One report per target, tagged with the metric collected
    pub reports: Vec<(MetricType, TargetReport)>,
}

impl CollectionSummary {
    /// Targets that fully succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|(_, r)| r.is_success()).count()
    }

    /// Targets that produced nothing.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|(_, r)| r.status == TargetStatus::Failed)
            .count()
    }
}

/// Collects GitHub and PyPI metrics into the snapshot store.
#[derive(Clone)]
pub struct MetricsCollector {
    fetchers: Fetchers,
    store: SnapshotStore,
    username: String,
    packages: Vec<String>,
    days_back: u32,
    per_page: u32,
    max_concurrent: usize,
    run_id: Option<String>,
}

impl MetricsCollector {
    /// Create a collector for the configured account and packages.
    #[must_use]
    pub fn new(fetchers: Fetchers, store: SnapshotStore, config: &AppConfig) -> Self {
        Self {
            fetchers,
            store,
            username: config.github.username.clone(),
            packages: config.pypi.packages.clone(),
            days_back: config.collection.days_back,
            per_page: config.github.per_page,
            max_concurrent: config.collection.concurrent_targets.max(1),
            run_id: None,
        }
    }

    /// Copy of this collector whose log entries carry `run_id`.
    #[must_use]
    pub fn for_run(&self, run_id: impl Into<String>) -> Self {
        Self {
            run_id: Some(run_id.into()),
            ..self.clone()
        }
    }

    fn github(&self) -> &PaginatedFetcher {
        &self.fetchers.github
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Turn a target result into a report and append it to the collection log.
    async fn finish(
        &self,
        metric: MetricType,
        target: &str,
        result: Result<(usize, Option<String>)>,
    ) -> TargetReport {
        let report = match result {
            Ok((items, error)) => TargetReport::from_items(target, items, error),
            Err(e) => TargetReport::failed(target, e.to_string()),
        };

        match report.status {
            TargetStatus::Success => {
                tracing::info!("Collected {} metrics for {}", metric.as_str(), target);
            }
            TargetStatus::Partial | TargetStatus::Failed => tracing::warn!(
                "{} metrics for {} ended {}: {}",
                metric.as_str(),
                target,
                report.status,
                report.error.as_deref().unwrap_or_default()
            ),
        }

        if let Err(e) = self
            .store
            .log_collection(
                self.run_id.as_deref(),
                metric,
                target,
                report.status.as_str(),
                report.error.as_deref(),
            )
            .await
        {
            tracing::error!("Failed to log collection of {}: {}", target, e);
        }

        report
    }

    /// Snapshot the account profile with star and fork totals.
    pub async fn collect_profile(&self, username: &str) -> TargetReport {
        let result = self.profile(username).await;
        self.finish(MetricType::Profile, username, result).await
    }

    async fn profile(&self, username: &str) -> Result<(usize, Option<String>)> {
        let path = format!("/users/{username}");
        let user: User = match self.github().fetch_json(&path, &[]).await {
            Ok(value) => decode(&path, value)?,
            Err(FetchError::Status { status: 404, .. }) => {
                return Err(CollectError::NotFound {
                    kind: "user",
                    name: username.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let (totals, error) = self.repo_totals(username).await;
        let snapshot = user.into_snapshot(username, totals, Self::today());
        self.store.save(&StoredRecord::from(snapshot)).await?;

        Ok((1, error))
    }

    async fn repo_totals(&self, username: &str) -> (RepoTotals, Option<String>) {
        let outcome = self
            .github()
            .collect_all(
                &format!("/users/{username}/repos"),
                &params(&[("type", "owner")]),
                PageOptions::per_page(self.per_page),
            )
            .await;

        let mut totals = RepoTotals::default();
        for repo in decode_records::<Repository>(outcome.records) {
            totals.add(&repo);
        }
        (totals, outcome.error.map(|e| e.to_string()))
    }

    /// Snapshot contribution counts over the last `days_back` days.
    ///
    /// A failed count is stored as zero and reported as a partial result.
    pub async fn collect_contributions(&self, username: &str, days_back: u32) -> TargetReport {
        let result = self.contributions(username, days_back).await;
        self.finish(MetricType::Contributions, username, result).await
    }

    async fn contributions(&self, username: &str, days_back: u32) -> Result<(usize, Option<String>)> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_back));
        let since = cutoff.format("%Y-%m-%d").to_string();
        let mut errors = Vec::new();

        let mut count = |result: std::result::Result<i64, FetchError>| match result {
            Ok(n) => n,
            Err(e) => {
                errors.push(e.to_string());
                0
            }
        };

        let prs_opened =
            count(self.search_total(&format!("author:{username} type:pr created:>={since}")).await);
        let prs_merged = count(
            self.search_total(&format!("author:{username} type:pr is:merged created:>={since}"))
                .await,
        );
        let prs_closed = count(
            self.search_total(&format!("author:{username} type:pr is:closed created:>={since}"))
                .await,
        );
        let issues_opened = count(
            self.search_total(&format!("author:{username} type:issue created:>={since}"))
                .await,
        );
        let issues_closed = count(
            self.search_total(&format!(
                "author:{username} type:issue is:closed created:>={since}"
            ))
            .await,
        );
        let reviews_given = count(
            self.search_total(&format!("reviewed-by:{username} type:pr created:>={since}"))
                .await,
        );
        let commits_total = count(self.push_commits(username, cutoff).await);
        let repositories_contributed_to =
            count(self.repositories_contributed(username, &since).await);

        if errors.len() == 8 {
            return Err(CollectError::Fetch(FetchError::Client(format!(
                "all contribution requests failed: {}",
                errors[0]
            ))));
        }

        let snapshot = ContributionSnapshot {
            username: username.to_string(),
            prs_opened,
            prs_merged,
            prs_closed,
            issues_opened,
            issues_closed,
            commits_total,
            reviews_given,
            repositories_contributed_to,
            snapshot_date: Self::today(),
        };
        self.store.save(&StoredRecord::from(snapshot)).await?;

        let error = errors
            .first()
            .map(|first| format!("{} of 8 counts failed: {first}", errors.len()));
        Ok((1, error))
    }

    /// `total_count` of an issue search, fetching a single result.
    async fn search_total(&self, query: &str) -> std::result::Result<i64, FetchError> {
        let value = self
            .github()
            .fetch_json("/search/issues", &params(&[("q", query), ("per_page", "1")]))
            .await?;
        let results: SearchResults = serde_json::from_value(value).map_err(|e| FetchError::Decode {
            path: "/search/issues".to_string(),
            message: e.to_string(),
        })?;
        Ok(results.total_count)
    }

    async fn push_commits(
        &self,
        username: &str,
        cutoff: DateTime<Utc>,
    ) -> std::result::Result<i64, FetchError> {
        let path = format!("/users/{username}/events/public");
        let value = self
            .github()
            .fetch_json(&path, &params(&[("per_page", "100")]))
            .await?;
        let events: Vec<Event> = decode_records(as_array(value));
        Ok(github::count_push_commits(&events, cutoff))
    }

    async fn repositories_contributed(
        &self,
        username: &str,
        since: &str,
    ) -> std::result::Result<i64, FetchError> {
        let query = format!("author:{username} type:pr is:merged created:>={since}");
        let value = self
            .github()
            .fetch_json(
                "/search/issues",
                &params(&[("q", query.as_str()), ("per_page", CONTRIBUTED_SEARCH_PER_PAGE)]),
            )
            .await?;
        let results: SearchResults = serde_json::from_value(value).map_err(|e| FetchError::Decode {
            path: "/search/issues".to_string(),
            message: e.to_string(),
        })?;

        let repos: BTreeSet<String> = results
            .items
            .iter()
            .filter_map(|item| item.repository_url.as_deref())
            .filter_map(github::repo_from_api_url)
            .collect();
        Ok(i64::try_from(repos.len()).unwrap_or(i64::MAX))
    }

    /// Snapshot every repository owned by `username`.
    pub async fn collect_repositories(&self, username: &str) -> TargetReport {
        let result = self.repositories(username).await;
        let target = format!("{username}/repos");
        self.finish(MetricType::Repositories, &target, result).await
    }

    async fn repositories(&self, username: &str) -> Result<(usize, Option<String>)> {
        let outcome = self
            .github()
            .collect_all(
                &format!("/users/{username}/repos"),
                &params(&[("sort", "updated")]),
                PageOptions::per_page(self.per_page),
            )
            .await;

        let day = Self::today();
        let mut saved = 0;
        for repo in decode_records::<Repository>(outcome.records) {
            self.store
                .save(&StoredRecord::from(repo.into_snapshot(day)))
                .await?;
            saved += 1;
        }

        Ok((saved, outcome.error.map(|e| e.to_string())))
    }

    /// Snapshot one package's release and download statistics.
    pub async fn collect_package(&self, name: &str) -> TargetReport {
        let result = self.package(name).await;
        self.finish(MetricType::Pypi, name, result).await
    }

    async fn package(&self, name: &str) -> Result<(usize, Option<String>)> {
        let path = format!("/{name}/json");
        let document: PackageDocument = match self.fetchers.pypi.fetch_json(&path, &[]).await {
            Ok(value) => decode(&path, value)?,
            Err(FetchError::Status { status: 404, .. }) => {
                return Err(CollectError::NotFound {
                    kind: "package",
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let stats_path = format!("/packages/{name}/recent");
        let (downloads, error) = match self.fetchers.pypi_stats.fetch_json(&stats_path, &[]).await
        {
            Ok(value) => match serde_json::from_value::<RecentDownloadsDocument>(value) {
                Ok(doc) => (doc.data, None),
                Err(e) => (RecentDownloads::default(), Some(format!("download stats: {e}"))),
            },
            Err(e) => (RecentDownloads::default(), Some(format!("download stats: {e}"))),
        };

        let snapshot = pypi::package_snapshot(name, document, downloads, Self::today());
        self.store.save(&StoredRecord::from(snapshot)).await?;

        Ok((1, error))
    }

    /// Collect every configured package, a bounded number at a time.
    pub async fn collect_packages(&self) -> Vec<TargetReport> {
        let mut futures = FuturesUnordered::new();
        let mut reports = Vec::with_capacity(self.packages.len());

        for name in &self.packages {
            futures.push(self.collect_package(name));

            while futures.len() >= self.max_concurrent {
                if let Some(report) = futures.next().await {
                    reports.push(report);
                }
            }
        }

        while let Some(report) = futures.next().await {
            reports.push(report);
        }

        reports
    }

    /// Run one full collection cycle under a fresh run id.
    ///
    /// GitHub metrics are skipped when no username is configured.
    pub async fn collect_all(&self) -> CollectionSummary {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let run = self.for_run(run_id.clone());
        let mut reports = Vec::new();

        tracing::info!("Starting metrics collection run {}", run_id);

        if run.username.is_empty() {
            tracing::warn!("No GitHub username configured, skipping GitHub metrics");
        } else {
            let username = run.username.clone();
            reports.push((MetricType::Profile, run.collect_profile(&username).await));
            reports.push((
                MetricType::Contributions,
                run.collect_contributions(&username, run.days_back).await,
            ));
            reports.push((
                MetricType::Repositories,
                run.collect_repositories(&username).await,
            ));
        }

        for report in run.collect_packages().await {
            reports.push((MetricType::Pypi, report));
        }

        let summary = CollectionSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            reports,
        };
        tracing::info!(
            "Collection run {} finished: {} succeeded, {} failed",
            summary.run_id,
            summary.succeeded(),
            summary.failed()
        );
        summary
    }
}

fn decode<T: serde::de::DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        CollectError::Fetch(FetchError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    })
}

fn as_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Decode each record, skipping the ones that do not fit `T`.
pub(crate) fn decode_records<T: serde::de::DeserializeOwned>(records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping undecodable record: {}", e);
                None
            }
        })
        .collect()
}
