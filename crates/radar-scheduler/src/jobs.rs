//! Job type definitions.

use crate::scheduler::{is_job_due, next_run_after};
use chrono::{DateTime, Utc};
use radar_core::ScheduleConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Work the scheduler can trigger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum JobType {
    /// Profile, contribution, repository and package snapshots
    CollectMetrics,
    /// Scored open issues across curated repositories
    IssueRadar,
    /// Vulnerability pattern scan of configured repositories
    VulnScan,
}

impl JobType {
    /// Stable name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CollectMetrics => "collect_metrics",
            Self::IssueRadar => "issue_radar",
            Self::VulnScan => "vuln_scan",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring job and its next due time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// Unique job id
    pub id: String,
    /// What the job runs
    pub job_type: JobType,
    /// Hours between runs
    pub interval_hours: u32,
    /// RFC 3339 timestamp of the next run
    pub next_run_at: String,
    /// RFC 3339 timestamp of the last finished run
    pub last_run_at: Option<String>,
    /// Disabled jobs are kept but never run
    pub enabled: bool,
}

impl ScheduledJob {
    /// An enabled job that is due immediately.
    #[must_use]
    pub fn new(job_type: JobType, interval_hours: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_type,
            interval_hours,
            next_run_at: Utc::now().to_rfc3339(),
            last_run_at: None,
            enabled: true,
        }
    }

    /// Same job, first due one interval from now.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.next_run_at = next_run_after(Utc::now(), self.interval_hours).to_rfc3339();
        self
    }

    /// Same job with `enabled` set.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether the job is enabled and its due time has passed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && is_job_due(&self.next_run_at, &now.to_rfc3339())
    }

    /// Parsed due time, `None` when the stored timestamp is malformed.
    #[must_use]
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.next_run_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Record a run finishing at `finished_at` and push the due time one
    /// interval past it.
    pub fn mark_ran(&mut self, finished_at: DateTime<Utc>) {
        self.last_run_at = Some(finished_at.to_rfc3339());
        self.next_run_at = next_run_after(finished_at, self.interval_hours).to_rfc3339();
    }
}

/// One job per [`JobType`], intervals taken from the schedule settings.
#[must_use]
pub fn default_jobs(schedule: &ScheduleConfig) -> Vec<ScheduledJob> {
    vec![
        ScheduledJob::new(JobType::CollectMetrics, schedule.collect_interval_hours),
        ScheduledJob::new(JobType::IssueRadar, schedule.radar_interval_hours),
        ScheduledJob::new(JobType::VulnScan, schedule.scan_interval_hours),
    ]
}
