//! Repository source scanning for vulnerability patterns.
//!
//! Files are listed through the contents API directory by directory, fetched
//! through their raw download URL and run through the [`PatternScanner`].
//! Findings are stored insert-or-ignore, so rescanning never overwrites the
//! evidence of a known finding.

use crate::error::Result;
use crate::github::ContentEntry;
use crate::metrics::decode_records;
use crate::outcome::TargetReport;
use futures::stream::{FuturesUnordered, StreamExt};
use radar_analysis::PatternScanner;
use radar_core::{AppConfig, Finding};
use radar_db::{SaveOutcome, SnapshotStore, StoredRecord};
use radar_fetch::{FetchError, PaginatedFetcher};
use serde_json::Value;

/// A file selected for scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path inside the repository
    pub path: String,
    /// Raw content URL
    pub download_url: String,
}

/// Files found by a listing walk and the first listing error, if any.
#[derive(Debug, Default)]
pub struct Listing {
    /// Selected files in walk order
    pub files: Vec<SourceFile>,
    /// First directory that could not be listed
    pub error: Option<String>,
}

/// Findings of one repository pass.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Pattern matches across every downloaded file
    pub findings: Vec<Finding>,
    /// Files downloaded and scanned
    pub files_scanned: usize,
    /// First listing or download error
    pub error: Option<String>,
}

/// Scans repository sources and stores findings.
#[derive(Clone)]
pub struct VulnScanner {
    github: PaginatedFetcher,
    store: SnapshotStore,
    scanner: PatternScanner,
    repos: Vec<String>,
    extensions: Vec<String>,
    max_files: usize,
    max_depth: usize,
    max_concurrent: usize,
}

impl VulnScanner {
    /// Create a scanner for the configured repositories.
    #[must_use]
    pub fn new(github: PaginatedFetcher, store: SnapshotStore, config: &AppConfig) -> Self {
        Self {
            github,
            store,
            scanner: PatternScanner::new(),
            repos: config.vuln_scan.repos.clone(),
            extensions: config.vuln_scan.extensions.clone(),
            max_files: config.vuln_scan.max_files,
            max_depth: config.vuln_scan.max_depth,
            max_concurrent: config.collection.concurrent_targets.max(1),
        }
    }

    fn wanted(&self, entry: &ContentEntry) -> bool {
        entry.is_file()
            && entry.download_url.is_some()
            && self.extensions.iter().any(|ext| entry.name.ends_with(ext.as_str()))
    }

    /// List scannable files of `repository`.
    ///
    /// Hidden directories are skipped and directories deeper than the
    /// configured depth are not entered. The walk stops once the file cap is
    /// reached.
    pub async fn list_files(&self, repository: &str) -> Listing {
        let mut listing = Listing::default();
        let mut pending = vec![(String::new(), 0_usize)];

        while let Some((dir, depth)) = pending.pop() {
            if listing.files.len() >= self.max_files {
                break;
            }

            let path = format!("/repos/{repository}/contents/{dir}");
            let entries: Vec<ContentEntry> = match self.github.fetch_json(&path, &[]).await {
                Ok(Value::Array(items)) => decode_records(items),
                Ok(_) => Vec::new(),
                Err(e) => {
                    tracing::warn!("Failed to list {}/{}: {}", repository, dir, e);
                    keep_first(&mut listing.error, &e);
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            for entry in entries {
                if self.wanted(&entry) {
                    if listing.files.len() < self.max_files {
                        if let Some(download_url) = entry.download_url {
                            listing.files.push(SourceFile {
                                path: entry.path,
                                download_url,
                            });
                        }
                    }
                } else if entry.is_visible_dir() && depth < self.max_depth {
                    subdirs.push(entry.path);
                }
            }
            pending.extend(subdirs.into_iter().rev().map(|p| (p, depth + 1)));
        }

        listing
    }

    /// Download one file's raw text.
    async fn download(&self, file: &SourceFile) -> std::result::Result<String, FetchError> {
        let response = self.github.fetch_one(&file.download_url, &[]).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                path: file.download_url.clone(),
                status: response.status,
            });
        }
        Ok(response.body)
    }

    /// Pattern-scan a repository without storing anything.
    pub async fn scan_files(&self, repository: &str) -> ScanResult {
        let listing = self.list_files(repository).await;
        let mut result = ScanResult {
            error: listing.error,
            ..ScanResult::default()
        };

        for file in &listing.files {
            match self.download(file).await {
                Ok(content) => {
                    result.files_scanned += 1;
                    result.findings.extend(self.scanner.scan(repository, &file.path, &content));
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch {}/{}: {}", repository, file.path, e);
                    keep_first(&mut result.error, &e);
                }
            }
        }

        tracing::debug!(
            "{}: {} of {} files scanned, {} findings",
            repository,
            result.files_scanned,
            listing.files.len(),
            result.findings.len()
        );
        result
    }

    async fn save(&self, findings: &[Finding]) -> Result<usize> {
        let mut inserted = 0;
        for finding in findings {
            if self.store.save(&StoredRecord::Finding(finding.clone())).await? == SaveOutcome::Inserted
            {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Scan one repository, store new findings and log the scan.
    ///
    /// The report counts findings not seen before. Its status follows the
    /// files scanned: an error with no file scanned fails the repository, an
    /// error after some files were scanned makes it partial.
    pub async fn scan_repository(&self, repository: &str) -> TargetReport {
        let scan = self.scan_files(repository).await;

        let report = match (self.save(&scan.findings).await, scan.error) {
            (Err(e), _) => TargetReport::failed(repository, e.to_string()),
            (Ok(inserted), None) => TargetReport::success(repository, inserted),
            (Ok(_), Some(error)) if scan.files_scanned == 0 => {
                TargetReport::failed(repository, error)
            }
            (Ok(inserted), Some(error)) => TargetReport::partial(repository, inserted, error),
        };

        if let Err(e) = self
            .store
            .log_scan(
                repository,
                report.items,
                report.status.as_str(),
                report.error.as_deref(),
            )
            .await
        {
            tracing::error!("Failed to log scan of {}: {}", repository, e);
        }

        tracing::info!(
            "Vulnerability scan of {}: {} new findings ({})",
            repository,
            report.items,
            report.status
        );
        report
    }

    /// Scan every configured repository, a bounded number at a time.
    pub async fn scan_all(&self) -> Vec<TargetReport> {
        let mut futures = FuturesUnordered::new();
        let mut reports = Vec::with_capacity(self.repos.len());

        for repo in &self.repos {
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

        reports
    }
}

fn keep_first(slot: &mut Option<String>, error: &FetchError) {
    if slot.is_none() {
        *slot = Some(error.to_string());
    }
}
