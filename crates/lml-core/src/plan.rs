//! Sweep planning: the regular candidate list and the retry selection.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};

use crate::store::ImportStore;
use crate::task::DownloadTask;

/// Candidate list for the regular sweep: one task per (sensor, hour offset)
/// for offsets in `[0, timeframe_hours)`, sensor-major, hours descending
/// from `now`. `timeframe_hours <= 0` yields an empty list.
///
/// There is no deduplication against earlier runs; overlap is expected and
/// absorbed by the content-level dedup in the import area.
pub fn regular_sweep(
    sensors: &[String],
    now: NaiveDateTime,
    timeframe_hours: i64,
) -> Vec<DownloadTask> {
    let mut tasks = Vec::new();
    for sensor in sensors {
        for offset in 0..timeframe_hours.max(0) {
            tasks.push(DownloadTask::new(sensor, now - Duration::hours(offset)));
        }
    }
    tasks
}

/// Candidate list for the retry sweep: every failure younger than the
/// window, oldest first, duplicates preserved (each logged failed attempt
/// earns its own re-attempt). A window of zero disables retries.
///
/// A malformed filename in the failure queue is a local fault and aborts
/// the run; only remote failures are treated as transient.
pub async fn retry_sweep(store: &ImportStore, window_hours: i64) -> Result<Vec<DownloadTask>> {
    let mut tasks = Vec::new();
    for filename in store.failures_within(window_hours).await? {
        let task = DownloadTask::from_filename(&filename)
            .with_context(|| format!("bad filename in failure queue: {filename}"))?;
        tasks.push(task);
    }
    Ok(tasks)
}
