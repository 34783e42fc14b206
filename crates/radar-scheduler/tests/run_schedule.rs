use async_trait::async_trait;
use chrono::{Duration, Utc};
use radar_scheduler::{run_schedule, CancellationToken, JobRunner, JobType, ScheduledJob};
use std::sync::Mutex;

/// Records the jobs it runs and cancels the schedule after `stop_after` runs.
struct RecordingRunner {
    runs: Mutex<Vec<JobType>>,
    stop_after: usize,
    token: CancellationToken,
}

impl RecordingRunner {
    fn new(stop_after: usize, token: &CancellationToken) -> Self {
        Self {
            runs: Mutex::new(Vec::new()),
            stop_after,
            token: token.clone(),
        }
    }

    fn runs(&self) -> Vec<JobType> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRunner for RecordingRunner {
    async fn run(&self, job: JobType) {
        let count = {
            let mut runs = self.runs.lock().unwrap();
            runs.push(job);
            runs.len()
        };
        if count >= self.stop_after {
            self.token.cancel();
        }
    }
}

fn timeout() -> std::time::Duration {
    std::time::Duration::from_secs(5)
}

#[tokio::test]
async fn test_runs_due_jobs_in_order() {
    let token = CancellationToken::new();
    let runner = RecordingRunner::new(3, &token);
    let jobs = vec![
        ScheduledJob::new(JobType::CollectMetrics, 24),
        ScheduledJob::new(JobType::IssueRadar, 4),
        ScheduledJob::new(JobType::VulnScan, 168),
    ];

    let before = Utc::now();
    let jobs = tokio::time::timeout(timeout(), run_schedule(jobs, token, &runner))
        .await
        .expect("scheduler stops after cancellation");

    assert_eq!(
        runner.runs(),
        vec![JobType::CollectMetrics, JobType::IssueRadar, JobType::VulnScan]
    );
    for job in &jobs {
        assert!(job.last_run_at.is_some());
        let next = job.next_run().expect("valid next run");
        assert!(next >= before + Duration::hours(i64::from(job.interval_hours)));
    }
}

#[tokio::test]
async fn test_cancellation_between_jobs_skips_the_rest() {
    let token = CancellationToken::new();
    let runner = RecordingRunner::new(1, &token);
    let jobs = vec![
        ScheduledJob::new(JobType::CollectMetrics, 24),
        ScheduledJob::new(JobType::IssueRadar, 4),
    ];

    let jobs = tokio::time::timeout(timeout(), run_schedule(jobs, token, &runner))
        .await
        .expect("scheduler stops after cancellation");

    assert_eq!(runner.runs(), vec![JobType::CollectMetrics]);
    assert!(jobs[1].last_run_at.is_none());
}

#[tokio::test]
async fn test_disabled_and_future_jobs_do_not_run() {
    let token = CancellationToken::new();
    let runner = RecordingRunner::new(usize::MAX, &token);
    let jobs = vec![
        ScheduledJob::new(JobType::CollectMetrics, 24).with_enabled(false),
        ScheduledJob::new(JobType::IssueRadar, 4).deferred(),
    ];

    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let jobs = tokio::time::timeout(timeout(), run_schedule(jobs, token, &runner))
        .await
        .expect("cancellation interrupts the sleep");

    assert!(runner.runs().is_empty());
    assert!(jobs.iter().all(|j| j.last_run_at.is_none()));
}

#[tokio::test]
async fn test_no_enabled_jobs_returns_immediately() {
    let token = CancellationToken::new();
    let runner = RecordingRunner::new(usize::MAX, &token);
    let jobs = vec![ScheduledJob::new(JobType::VulnScan, 168).with_enabled(false)];

    let jobs = tokio::time::timeout(timeout(), run_schedule(jobs, token.clone(), &runner))
        .await
        .expect("nothing to wait for");

    assert_eq!(jobs.len(), 1);
    assert!(!token.is_cancelled());
}
