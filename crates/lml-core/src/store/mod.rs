//! SQLite-backed import area.
//!
//! Holds everything the run persists: the run configuration keys, the
//! sensor registry, the failure queue, the message-log audit trail, the
//! staged payloads and the derived series metadata. Writes belonging to one
//! sweep go through a [`SweepTx`] and become durable together at commit;
//! a crash before the commit point loses that sweep's writes as a unit.

mod db;
mod ops;
mod types;

pub use db::ImportStore;
#[cfg(test)]
pub(crate) use db::open_memory;
pub use ops::SweepTx;
pub use types::{FailureRecord, MessageLogEntry, Sensor};

/// Status written for every failed download attempt.
pub const RETRY_STATUS: &str = "RETRY";
