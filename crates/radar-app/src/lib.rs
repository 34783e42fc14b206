//! Radar application shell.
//!
//! Loads configuration, opens the database and drives the scheduler until
//! Ctrl-C. Collection logic lives in the other `crates/`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod state;

pub use state::AppState;

use radar_core::AppConfig;
use radar_scheduler::{run_schedule, CancellationToken};
use tracing::info;

/// Initialize tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,radar=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Run the scheduler until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Radar v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env()?;
    let state = AppState::open(config).await?;
    let jobs = state.scheduled_jobs();

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested, finishing current job"),
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
        shutdown.cancel();
    });

    run_schedule(jobs, token, &state).await;
    state.db.close().await;

    info!("Radar stopped");
    Ok(())
}
