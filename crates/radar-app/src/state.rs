//! Application state: the database and the three collectors, wired to one
//! shared quota tracker.

use async_trait::async_trait;
use radar_collector::{Fetchers, IssueRadar, MetricsCollector, TargetReport, TargetStatus, VulnScanner};
use radar_core::AppConfig;
use radar_db::Database;
use radar_fetch::RateLimiter;
use radar_scheduler::{default_jobs, JobRunner, JobType, ScheduledJob};
use std::sync::Arc;

/// Everything a scheduled job needs.
pub struct AppState {
    /// Loaded configuration
    pub config: AppConfig,
    /// Open, migrated database
    pub db: Database,
    /// Daily snapshots
    pub metrics: MetricsCollector,
    /// Scored open issues
    pub radar: IssueRadar,
    /// Source pattern scans
    pub vuln: VulnScanner,
}

impl AppState {
    /// Open the configured database, run migrations and build HTTP clients.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let path = config.database_path()?;
        tracing::info!("Database: {}", path.display());

        let db = Database::new(&path).await?;
        db.run_migrations().await?;

        let fetchers = Fetchers::from_config(&config, Arc::new(RateLimiter::new()))?;
        Ok(Self::with_fetchers(config, db, fetchers))
    }

    /// Build the collectors over existing fetchers and database.
    #[must_use]
    pub fn with_fetchers(config: AppConfig, db: Database, fetchers: Fetchers) -> Self {
        let store = db.store();
        let metrics = MetricsCollector::new(fetchers.clone(), store.clone(), &config);
        let radar = IssueRadar::new(fetchers.github.clone(), store.clone(), &config);
        let vuln = VulnScanner::new(fetchers.github, store, &config);

        Self {
            config,
            db,
            metrics,
            radar,
            vuln,
        }
    }

    /// The job list for this configuration.
    ///
    /// Metrics collection is disabled when there is neither an account nor a
    /// package to track, the vulnerability scan when no repository is listed.
    #[must_use]
    pub fn scheduled_jobs(&self) -> Vec<ScheduledJob> {
        let has_metrics =
            !self.config.github.username.is_empty() || !self.config.pypi.packages.is_empty();
        let has_scan_targets = !self.config.vuln_scan.repos.is_empty();

        default_jobs(&self.config.schedule)
            .into_iter()
            .map(|job| match job.job_type {
                JobType::CollectMetrics => job.with_enabled(has_metrics),
                JobType::IssueRadar => job.with_enabled(!self.config.radar.categories.is_empty()),
                JobType::VulnScan => job.with_enabled(has_scan_targets),
            })
            .collect()
    }
}

fn log_reports(job: JobType, reports: &[TargetReport]) {
    let failed: Vec<&str> = reports
        .iter()
        .filter(|r| r.status == TargetStatus::Failed)
        .map(|r| r.target.as_str())
        .collect();
    let items: usize = reports.iter().map(|r| r.items).sum();

    tracing::info!(
        "{} finished: {} targets, {} items, {} failed",
        job,
        reports.len(),
        items,
        failed.len()
    );
    if !failed.is_empty() {
        tracing::warn!("{} failed targets: {}", job, failed.join(", "));
    }
}

#[async_trait]
impl JobRunner for AppState {
    async fn run(&self, job: JobType) {
        match job {
            JobType::CollectMetrics => {
                let summary = self.metrics.collect_all().await;
                let reports: Vec<TargetReport> =
                    summary.reports.into_iter().map(|(_, report)| report).collect();
                log_reports(job, &reports);
            }
            JobType::IssueRadar => log_reports(job, &self.radar.scan_all().await),
            JobType::VulnScan => log_reports(job, &self.vuln.scan_all().await),
        }
    }
}
