//! Row types surfaced by the import store.

use chrono::NaiveDateTime;

/// A registered sensor. Immutable for the duration of a run; maintained by
/// the external provisioning workflow, read-only here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sensor {
    pub code: String,
    pub download_enabled: bool,
}

/// One logged failed download attempt. Append-only: repeated failures of
/// the same filename each get their own row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub filename: String,
    pub status: String,
    pub created_at: i64,
}

/// One audit-trail entry. Write-only from this subsystem's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLogEntry {
    pub logged_at: i64,
    pub operation: String,
    pub filename: String,
    pub level: String,
    pub message: String,
}

/// Hour format used for `observed_hour` columns (hour-truncated).
pub(crate) const HOUR_COLUMN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_hour(t: &NaiveDateTime) -> String {
    t.format(HOUR_COLUMN_FORMAT).to_string()
}
