//! Contribution opportunity radar.
//!
//! Walks the open issues of curated repositories, scores them and keeps the
//! ones worth a look. Each repository scan leaves one scan log entry.

use crate::error::Result;
use crate::github::IssueItem;
use crate::metrics::decode_records;
use crate::outcome::TargetReport;
use chrono::{Duration, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use radar_analysis::scoring;
use radar_core::{AppConfig, Issue, RepoCategory};
use radar_db::{SnapshotStore, StoredRecord};
use radar_fetch::{params, PageOptions, PaginatedFetcher};

/// Label qualifiers allowed in one search query.
pub const MAX_SEARCH_LABELS: usize = 3;

/// Page size of the issue search endpoint.
const SEARCH_PER_PAGE: u32 = 30;

/// Scores and stores open issues of curated repositories.
#[derive(Clone)]
pub struct IssueRadar {
    github: PaginatedFetcher,
    store: SnapshotStore,
    categories: Vec<RepoCategory>,
    min_score: f64,
    per_page: u32,
    max_pages: u32,
    max_search_pages: u32,
    max_concurrent: usize,
}

impl IssueRadar {
    /// Create a radar over the configured categories.
    #[must_use]
    pub fn new(github: PaginatedFetcher, store: SnapshotStore, config: &AppConfig) -> Self {
        Self {
            github,
            store,
            categories: config.radar.categories.clone(),
            min_score: config.radar.min_score,
            per_page: config.radar.per_page,
            max_pages: config.radar.max_pages,
            max_search_pages: config.github.max_search_pages,
            max_concurrent: config.collection.concurrent_targets.max(1),
        }
    }

    /// Repositories of the configured categories, first occurrence kept.
    #[must_use]
    pub fn targets(&self) -> Vec<&'static str> {
        let mut targets: Vec<&'static str> = Vec::new();
        for category in &self.categories {
            for repo in scoring::repositories(*category) {
                if !targets.contains(repo) {
                    targets.push(*repo);
                }
            }
        }
        targets
    }

    /// Scan every target repository, a bounded number at a time.
    pub async fn scan_all(&self) -> Vec<TargetReport> {
        let targets = self.targets();
        tracing::info!("Issue radar scanning {} repositories", targets.len());

        let mut futures = FuturesUnordered::new();
        let mut reports = Vec::with_capacity(targets.len());

        for repo in targets {
            futures.push(self.scan_repository(repo));

            while futures.len() >= self.max_concurrent {
                if let Some(report) = futures.next().await {
                    reports.push(report);
                }
            }
        }

        while let Some(report) = futures.next().await {
            reports.push(report);
        }

        let stored: usize = reports.iter().map(|r| r.items).sum();
        tracing::info!(
            "Issue radar finished: {} issues stored from {} repositories",
            stored,
            reports.len()
        );
        reports
    }

    /// Score the open issues of one repository and store those above the
    /// threshold.
    pub async fn scan_repository(&self, repository: &str) -> TargetReport {
        let outcome = self
            .github
            .collect_all(
                &format!("/repos/{repository}/issues"),
                &params(&[("state", "open"), ("sort", "updated"), ("direction", "desc")]),
                PageOptions::per_page(self.per_page).with_max_pages(self.max_pages),
            )
            .await;
        let fetch_error = outcome.error.map(|e| e.to_string());

        let issues = self.score_items(repository, decode_records(outcome.records));
        let saved = match self.save(&issues).await {
            Ok(saved) => saved,
            Err(e) => {
                let report = TargetReport::failed(repository, e.to_string());
                self.log(&report).await;
                return report;
            }
        };

        let report = TargetReport::from_items(repository, saved, fetch_error);
        self.log(&report).await;
        tracing::debug!("{}: {} high-value issues", repository, saved);
        report
    }

    /// Search one repository's recently updated issues carrying `labels`.
    ///
    /// At most [`MAX_SEARCH_LABELS`] labels are used. Results are scored and
    /// categorized but not stored.
    pub async fn search_issues(
        &self,
        repository: &str,
        labels: &[&str],
        since_days: u32,
    ) -> Result<Vec<Issue>> {
        let query = search_query(repository, labels, since_days);
        let outcome = self
            .github
            .collect_all(
                "/search/issues",
                &params(&[("q", query.as_str()), ("sort", "updated"), ("order", "desc")]),
                PageOptions::per_page(SEARCH_PER_PAGE).with_max_pages(self.max_search_pages),
            )
            .await;

        if let Some(error) = outcome.error {
            if outcome.records.is_empty() {
                return Err(error.into());
            }
        }

        Ok(self.score_items(repository, decode_records(outcome.records)))
    }

    fn score_items(&self, repository: &str, items: Vec<IssueItem>) -> Vec<Issue> {
        let category = scoring::categorize(repository);
        let now = Utc::now();

        items
            .into_iter()
            .filter(|item| !item.is_pull_request())
            .map(|item| {
                let mut issue = item.into_issue(repository, category);
                issue.score = scoring::score(&issue, now);
                issue
            })
            .collect()
    }

    async fn save(&self, issues: &[Issue]) -> Result<usize> {
        let mut saved = 0;
        for issue in issues.iter().filter(|i| i.score >= self.min_score) {
            self.store.save(&StoredRecord::Issue(issue.clone())).await?;
            saved += 1;
        }
        Ok(saved)
    }

    async fn log(&self, report: &TargetReport) {
        if let Err(e) = self
            .store
            .log_scan(
                &report.target,
                report.items,
                report.status.as_str(),
                report.error.as_deref(),
            )
            .await
        {
            tracing::error!("Failed to log scan of {}: {}", report.target, e);
        }
    }
}

/// Issue search query for one repository.
#[must_use]
pub fn search_query(repository: &str, labels: &[&str], since_days: u32) -> String {
    let since = (Utc::now() - Duration::days(i64::from(since_days))).format("%Y-%m-%d");
    let mut parts = vec![
        format!("repo:{repository}"),
        "is:issue".to_string(),
        "state:open".to_string(),
        format!("updated:>={since}"),
    ];
    parts.extend(
        labels
            .iter()
            .take(MAX_SEARCH_LABELS)
            .map(|label| format!("label:\"{label}\"")),
    );
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_caps_labels() {
        let query = search_query("pallets/flask", &["bug", "help wanted", "easy", "security"], 90);

        assert!(query.starts_with("repo:pallets/flask is:issue state:open updated:>="));
        assert!(query.ends_with(r#"label:"bug" label:"help wanted" label:"easy""#));
        assert!(!query.contains("security"));
    }

    #[test]
    fn test_search_query_without_labels() {
        let query = search_query("a/b", &[], 7);
        assert_eq!(query.matches("label:").count(), 0);
    }
}
