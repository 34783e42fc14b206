//! Job scheduling: determines when jobs are due and drives the run loop.

use crate::jobs::{JobType, ScheduledJob};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;

/// Executes one job. Failures are reported by the runner itself.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run `job` to completion.
    async fn run(&self, job: JobType);
}

/// Returns true if `next_run_at` is in the past relative to `now`.
#[must_use]
pub fn is_job_due(next_run_at: &str, now: &str) -> bool {
    let next = DateTime::parse_from_rfc3339(next_run_at).ok();
    let current = DateTime::parse_from_rfc3339(now).ok();
    match (next, current) {
        (Some(n), Some(c)) => n <= c,
        _ => false,
    }
}

/// `from + interval_hours`.
#[must_use]
pub fn next_run_after(from: DateTime<Utc>, interval_hours: u32) -> DateTime<Utc> {
    from + Duration::hours(i64::from(interval_hours))
}

/// Return the RFC 3339 timestamp for `now + interval_hours`.
#[must_use]
pub fn next_run_timestamp(interval_hours: u32) -> String {
    next_run_after(Utc::now(), interval_hours).to_rfc3339()
}

/// Time until the earliest enabled job is due, zero when one is overdue.
///
/// `None` when no enabled job has a readable due time.
#[must_use]
pub fn time_until_next(jobs: &[ScheduledJob], now: DateTime<Utc>) -> Option<std::time::Duration> {
    jobs.iter()
        .filter(|job| job.enabled)
        .filter_map(ScheduledJob::next_run)
        .min()
        .map(|next| (next - now).to_std().unwrap_or_default())
}

/// Run due jobs until `token` is cancelled.
///
/// Each cycle runs every due job in order, then sleeps until the next one is
/// due. Cancellation is checked between jobs and while sleeping; a job that
/// has started always finishes. Returns the jobs with their updated run
/// times.
pub async fn run_schedule(
    mut jobs: Vec<ScheduledJob>,
    token: CancellationToken,
    runner: &dyn JobRunner,
) -> Vec<ScheduledJob> {
    tracing::info!("Scheduler started with {} jobs", jobs.len());

    'cycle: loop {
        for job in &mut jobs {
            if token.is_cancelled() {
                break 'cycle;
            }
            if !job.is_due(Utc::now()) {
                continue;
            }

            tracing::info!("Running scheduled job {}", job.job_type);
            let started = Utc::now();
            runner.run(job.job_type).await;
            let finished = Utc::now();
            job.mark_ran(finished);
            tracing::info!(
                "Job {} finished in {}s, next run at {}",
                job.job_type,
                (finished - started).num_seconds(),
                job.next_run_at
            );
        }

        let Some(wait) = time_until_next(&jobs, Utc::now()) else {
            tracing::warn!("No enabled jobs to schedule");
            break;
        };
        tracing::debug!("Scheduler sleeping {}s", wait.as_secs());

        tokio::select! {
            () = token.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }
    }

    tracing::info!("Scheduler stopped");
    jobs
}
