//! Radar Scheduler - interval jobs for collection runs.
//!
//! Jobs carry an RFC 3339 due time and an interval in hours. [`run_schedule`]
//! runs whatever is due, sleeps until the next due time and stops on
//! cancellation.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod jobs;
pub mod scheduler;

pub use jobs::{default_jobs, JobType, ScheduledJob};
pub use scheduler::{
    is_job_due, next_run_after, next_run_timestamp, run_schedule, time_until_next, JobRunner,
};
pub use tokio_util::sync::CancellationToken;
