//! Run orchestration: regular sweep, retry sweep, metadata refresh.
//!
//! One run walks a fixed phase chain. Each sweep drives its task list
//! sequentially through the fetcher, staging successes and queueing every
//! failure variant for retry, then commits the sweep's writes as one unit.
//! The retry sweep runs with a longer timeout and slower pacing: the server
//! already showed signs of trouble. Only remote-fetch failures are
//! recoverable; anything local aborts the run through `?`.

use anyhow::Result;
use chrono::NaiveDateTime;
use std::time::Duration;

use crate::config::RunConfig;
use crate::fetch::FetchOutcome;
use crate::pace::Pacer;
use crate::plan;
use crate::store::{ImportStore, SweepTx, RETRY_STATUS};
use crate::task::DownloadTask;

/// Operation tag for message-log entries written by the drive loop.
pub const OPERATION: &str = "HTTPDownload";

/// Extra timeout allowance for the retry sweep.
const RETRY_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Pacing for the regular sweep; the retry pace comes from configuration.
const REGULAR_PACE: Duration = Duration::from_millis(1);

/// Phases of one run, walked strictly top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    RegularSweep,
    RegularCommitted,
    RetrySweep,
    RetryCommitted,
    MetadataRefreshed,
    Done,
}

/// Per-run counters, reported when the run reaches `Done`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Fetch attempts across both sweeps.
    pub attempted: usize,
    /// Payloads handed to the import area.
    pub stored: usize,
    /// Failed attempts queued for retry (both sweeps).
    pub failed: usize,
    /// Tasks selected for the retry sweep.
    pub retried: usize,
    /// Whether the downstream series refresh reported success.
    pub series_refreshed: bool,
}

/// Execute one full run against `store`, using `fetch` for every retrieval.
///
/// `fetch` is called with the target filename and the timeout to apply; the
/// production closure wraps [`crate::fetch::fetch_file`], tests script it.
/// Lookbacks come from the (already resolved, possibly overridden) config.
pub async fn execute_run<F>(
    store: &ImportStore,
    config: &RunConfig,
    now: NaiveDateTime,
    fetch: &mut F,
) -> Result<RunReport>
where
    F: FnMut(&str, Duration) -> Result<FetchOutcome>,
{
    let mut report = RunReport::default();
    let mut phase = RunPhase::Idle;

    while phase != RunPhase::Done {
        phase = match phase {
            RunPhase::Idle => RunPhase::RegularSweep,

            RunPhase::RegularSweep => {
                let sensors = store.enabled_sensors().await?;
                let tasks = plan::regular_sweep(&sensors, now, config.timeframe_hours);
                tracing::info!(
                    "regular sweep: {} sensors, {} hours, {} candidates",
                    sensors.len(),
                    config.timeframe_hours,
                    tasks.len()
                );

                let mut tx = store.begin_sweep().await?;
                tx.log_message(OPERATION, "*", "INFO", "start of http downloads")
                    .await?;
                drive(
                    &mut tx,
                    &tasks,
                    config.http_timeout,
                    REGULAR_PACE,
                    fetch,
                    &mut report,
                )
                .await?;
                tx.log_message(OPERATION, "*", "INFO", "end of http downloads")
                    .await?;
                tx.commit().await?;
                RunPhase::RegularCommitted
            }

            RunPhase::RegularCommitted => RunPhase::RetrySweep,

            RunPhase::RetrySweep => {
                // Selection happens after the regular commit, so failures
                // logged moments ago are already eligible here.
                let tasks = plan::retry_sweep(store, config.retry_timeframe_hours).await?;
                report.retried = tasks.len();
                tracing::info!(
                    "retry sweep: {} candidates within {} hours",
                    tasks.len(),
                    config.retry_timeframe_hours
                );

                let mut tx = store.begin_sweep().await?;
                tx.log_message(OPERATION, "*", "INFO", "start of retrying failed http downloads")
                    .await?;
                drive(
                    &mut tx,
                    &tasks,
                    config.http_timeout + RETRY_TIMEOUT_MARGIN,
                    config.retry_pace,
                    fetch,
                    &mut report,
                )
                .await?;
                tx.log_message(OPERATION, "*", "INFO", "end of retrying failed http downloads")
                    .await?;
                tx.commit().await?;
                RunPhase::RetryCommitted
            }

            RunPhase::RetryCommitted => {
                if store.refresh_series().await? {
                    report.series_refreshed = true;
                    tracing::info!("series metadata refreshed");
                }
                RunPhase::MetadataRefreshed
            }

            RunPhase::MetadataRefreshed => RunPhase::Done,
            RunPhase::Done => RunPhase::Done,
        };
    }

    Ok(report)
}

/// Drive every task of one sweep sequentially through the fetcher.
async fn drive<F>(
    tx: &mut SweepTx,
    tasks: &[DownloadTask],
    timeout: Duration,
    pace: Duration,
    fetch: &mut F,
    report: &mut RunReport,
) -> Result<()>
where
    F: FnMut(&str, Duration) -> Result<FetchOutcome>,
{
    let mut pacer = Pacer::new(pace);
    for task in tasks {
        pacer.pace().await;
        tracing::info!(
            "retrieving {} ({} {})",
            task.filename,
            task.sensor_code,
            task.observed_hour
        );
        report.attempted += 1;

        match fetch(&task.filename, timeout)? {
            FetchOutcome::Success {
                payload,
                component,
                observed_hour,
            } => {
                tx.stage_file(&task.filename, &component, &observed_hour, &payload)
                    .await?;
                report.stored += 1;
            }
            failure => {
                tracing::warn!("{}: {}", task.filename, failure.describe());
                tx.log_message(OPERATION, &task.filename, "ERROR", &failure.describe())
                    .await?;
                tx.record_failure(&task.filename, RETRY_STATUS).await?;
                report.failed += 1;
            }
        }
    }
    Ok(())
}
