//! Download tasks and the hour-stamped filename convention.
//!
//! Archive filenames look like `2020010210-NO2.xml`: the segment before the
//! first `-` is the observation hour (`YYYYMMDDHH`), the rest is the sensor
//! component code plus an `.xml` suffix. Derivation (planner) and parsing
//! (ingestion metadata, retry queue) both live here so they cannot drift.
//! Metadata is always derived from the filename, never from the payload;
//! downstream deduplication depends on that convention.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

/// Hour stamp used in archive filenames.
const HOUR_STAMP: &str = "%Y%m%d%H";

/// A filename that does not follow the `<YYYYMMDDHH>-<CODE>.xml` convention.
#[derive(Debug, Error)]
pub enum FilenameError {
    #[error("filename {0:?} has no '-' separator")]
    MissingSeparator(String),
    #[error("filename {0:?} has an invalid hour stamp")]
    BadHourStamp(String),
}

/// One candidate file for a sweep.
///
/// Ephemeral: built by the planner (or rebuilt from the failure queue for
/// the retry sweep), consumed once by the drive loop, never persisted.
/// Filenames are deterministic, so re-planning the same sensor/hour always
/// yields the same candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub sensor_code: String,
    pub filename: String,
    pub observed_hour: NaiveDateTime,
}

impl DownloadTask {
    /// Task for `sensor` at `hour`; minutes and seconds are truncated.
    pub fn new(sensor: &str, hour: NaiveDateTime) -> Self {
        let hour = truncate_to_hour(hour);
        DownloadTask {
            sensor_code: sensor.to_string(),
            filename: format!("{}-{}.xml", hour.format(HOUR_STAMP), sensor),
            observed_hour: hour,
        }
    }

    /// Rebuild a task from a filename alone (retry sweep: sensor and hour
    /// are already encoded in the name).
    pub fn from_filename(filename: &str) -> Result<Self, FilenameError> {
        let (component, observed_hour) = parse_filename(filename)?;
        Ok(DownloadTask {
            sensor_code: component,
            filename: filename.to_string(),
            observed_hour,
        })
    }
}

/// Truncate a timestamp to the start of its hour.
pub fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Split a filename into its component code and observed hour.
///
/// The component is everything after the first `-`, upper-cased, with the
/// `.XML` suffix stripped. Input case does not matter.
pub fn parse_filename(filename: &str) -> Result<(String, NaiveDateTime), FilenameError> {
    let (stamp, rest) = filename
        .split_once('-')
        .ok_or_else(|| FilenameError::MissingSeparator(filename.to_string()))?;

    let component = rest.to_uppercase();
    let component = component
        .strip_suffix(".XML")
        .unwrap_or(&component)
        .to_string();

    let bad = || FilenameError::BadHourStamp(filename.to_string());
    if stamp.len() != 10 || !stamp.is_ascii() {
        return Err(bad());
    }
    let date = NaiveDate::parse_from_str(&stamp[..8], "%Y%m%d").map_err(|_| bad())?;
    let hour: u32 = stamp[8..10].parse().map_err(|_| bad())?;
    let observed = date.and_hms_opt(hour, 0, 0).ok_or_else(bad)?;
    Ok((component, observed))
}
