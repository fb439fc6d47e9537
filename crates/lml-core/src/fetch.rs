//! One timed HTTP retrieval with a closed outcome taxonomy.
//!
//! Uses the curl crate (libcurl). The fetcher never retries by itself:
//! recovery is a separate, later sweep owned by the orchestrator. Runs in
//! the current thread and blocks up to the configured timeout.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::time::Duration;

use crate::task;

/// Classified result of one retrieval attempt.
///
/// Every non-`Success` variant is a retryable remote failure. Local faults
/// (malformed filename, curl handle setup) surface as hard errors instead
/// and abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Non-empty body retrieved. Component and hour are derived from the
    /// filename, not the payload.
    Success {
        payload: Vec<u8>,
        component: String,
        observed_hour: NaiveDateTime,
    },
    /// Transport succeeded but the body was empty. A failure, not a success.
    Empty,
    /// Remote answered with a non-success status.
    Http(u32),
    /// Connection or resolution failure.
    Network(String),
    /// No response inside the timeout.
    Timeout,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// Short cause description for the message log.
    pub fn describe(&self) -> String {
        match self {
            FetchOutcome::Success { payload, .. } => {
                format!("retrieved {} bytes", payload.len())
            }
            FetchOutcome::Empty => "empty response body".to_string(),
            FetchOutcome::Http(code) => format!("http status {code}"),
            FetchOutcome::Network(reason) => format!("network failure: {reason}"),
            FetchOutcome::Timeout => "no response within timeout".to_string(),
        }
    }
}

/// Classify a curl transfer error. Timeouts get their own variant; every
/// other transport-level failure counts as a network failure.
fn classify_transfer_error(e: &curl::Error) -> FetchOutcome {
    if e.is_operation_timedout() {
        return FetchOutcome::Timeout;
    }
    FetchOutcome::Network(e.description().to_string())
}

/// Perform one blocking GET of `<server><base_path><filename>`.
///
/// An optional forward proxy, when configured, is exported to the process
/// environment at startup and picked up by libcurl. Returns `Err` only for
/// local faults; every remote misbehavior maps to a `FetchOutcome` variant,
/// and identical remote behavior always classifies identically.
pub fn fetch_file(
    server: &str,
    base_path: &str,
    filename: &str,
    timeout: Duration,
) -> Result<FetchOutcome> {
    let (component, observed_hour) = task::parse_filename(filename)
        .with_context(|| format!("cannot derive metadata for {filename}"))?;
    let url = format!("{server}{base_path}{filename}");

    let mut body: Vec<u8> = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(&url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.connect_timeout(timeout)?;
    easy.timeout(timeout)?;

    let transferred = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    };

    if let Err(e) = transferred {
        return Ok(classify_transfer_error(&e));
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        return Ok(FetchOutcome::Http(code));
    }
    if body.is_empty() {
        return Ok(FetchOutcome::Empty);
    }
    Ok(FetchOutcome::Success {
        payload: body,
        component,
        observed_hour,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_names_the_cause() {
        assert_eq!(FetchOutcome::Http(503).describe(), "http status 503");
        assert_eq!(FetchOutcome::Empty.describe(), "empty response body");
        assert_eq!(
            FetchOutcome::Timeout.describe(),
            "no response within timeout"
        );
        assert!(FetchOutcome::Network("refused".into())
            .describe()
            .contains("refused"));
    }

    #[test]
    fn only_success_counts_as_success() {
        assert!(!FetchOutcome::Empty.is_success());
        assert!(!FetchOutcome::Http(200).is_success());
        assert!(!FetchOutcome::Timeout.is_success());
    }

    #[test]
    fn malformed_filename_is_a_local_fault() {
        let err = fetch_file("http://localhost:1", "/", "nodash.xml", Duration::from_secs(1));
        assert!(err.is_err());
    }
}
