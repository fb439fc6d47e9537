//! Read and write operations on the import area.
//!
//! Reads go straight through the pool. Sweep writes (failures, audit
//! messages, staged payloads) go through [`SweepTx`] so a whole sweep
//! commits or disappears together.

use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::{Row, Sqlite, Transaction};

use super::db::{unix_timestamp, ImportStore};
use super::types::{format_hour, FailureRecord, MessageLogEntry, Sensor};

impl ImportStore {
    /// Look up one configuration key. Interpretation (and whether a missing
    /// key is fatal) is the caller's concern.
    pub async fn config_value(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM configuration WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    /// Insert or replace a configuration key.
    pub async fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO configuration (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Codes of all sensors flagged for download, ordered by code.
    pub async fn enabled_sensors(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT code FROM sensors WHERE download_enabled != 0 ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("code")).collect())
    }

    /// Register or update a sensor. Provisioning normally does this; kept
    /// here for seeding and tests.
    pub async fn upsert_sensor(&self, code: &str, download_enabled: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sensors (code, download_enabled) VALUES (?1, ?2)
            ON CONFLICT(code) DO UPDATE SET download_enabled = excluded.download_enabled
            "#,
        )
        .bind(code)
        .bind(download_enabled as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All registered sensors, ordered by code.
    pub async fn list_sensors(&self) -> Result<Vec<Sensor>> {
        let rows = sqlx::query("SELECT code, download_enabled FROM sensors ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Sensor {
                code: r.get("code"),
                download_enabled: r.get::<i64, _>("download_enabled") != 0,
            })
            .collect())
    }

    /// Filenames of failures strictly younger than `hours`, oldest first.
    ///
    /// Duplicates are preserved: one row per failed attempt means one
    /// re-attempt per row. `hours <= 0` is the explicit retry opt-out and
    /// always yields an empty list.
    pub async fn failures_within(&self, hours: i64) -> Result<Vec<String>> {
        if hours <= 0 {
            return Ok(Vec::new());
        }
        let cutoff = unix_timestamp() - hours * 3600;
        let rows = sqlx::query(
            "SELECT filename FROM download_failures WHERE created_at > ?1 ORDER BY id",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("filename")).collect())
    }

    /// Every failure row, oldest first.
    pub async fn failures(&self) -> Result<Vec<FailureRecord>> {
        let rows = sqlx::query(
            "SELECT filename, status, created_at FROM download_failures ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| FailureRecord {
                filename: r.get("filename"),
                status: r.get("status"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Audit-trail entries for one operation, oldest first.
    pub async fn messages(&self, operation: &str) -> Result<Vec<MessageLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT logged_at, operation, filename, level, message
            FROM message_log WHERE operation = ?1 ORDER BY id
            "#,
        )
        .bind(operation)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| MessageLogEntry {
                logged_at: r.get("logged_at"),
                operation: r.get("operation"),
                filename: r.get("filename"),
                level: r.get("level"),
                message: r.get("message"),
            })
            .collect())
    }

    /// Staged payload for a filename, if any.
    pub async fn staged_payload(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT payload FROM import_files WHERE filename = ?1")
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("payload")))
    }

    /// Number of staged files.
    pub async fn staged_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM import_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Begin a sweep transaction.
    pub async fn begin_sweep(&self) -> Result<SweepTx> {
        let tx = self.pool.begin().await?;
        Ok(SweepTx { tx })
    }

    /// Recompute per-component series metadata (first/last observed hour
    /// and file count) from the staged files, in its own transaction.
    /// Returns true on success; this is the downstream refresh trigger run
    /// once per run after both sweeps.
    pub async fn refresh_series(&self) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM series").execute(&mut *tx).await?;
        sqlx::query(
            r#"
            INSERT INTO series (component, first_hour, last_hour, file_count, refreshed_at)
            SELECT component, MIN(observed_hour), MAX(observed_hour), COUNT(*), ?1
            FROM import_files GROUP BY component
            "#,
        )
        .bind(unix_timestamp())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Series row for one component: (first_hour, last_hour, file_count).
    pub async fn series_for(&self, component: &str) -> Result<Option<(String, String, i64)>> {
        let row = sqlx::query(
            "SELECT first_hour, last_hour, file_count FROM series WHERE component = ?1",
        )
        .bind(component)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| (r.get("first_hour"), r.get("last_hour"), r.get("file_count"))))
    }
}

/// Accumulated writes of one sweep. Nothing is durable until `commit`.
pub struct SweepTx {
    tx: Transaction<'static, Sqlite>,
}

impl SweepTx {
    /// Append a failure record. No uniqueness constraint: recording the
    /// same filename again is safe and expected.
    pub async fn record_failure(&mut self, filename: &str, status: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO download_failures (filename, status, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(filename)
        .bind(status)
        .bind(unix_timestamp())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Append an audit-trail entry.
    pub async fn log_message(
        &mut self,
        operation: &str,
        filename: &str,
        level: &str,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO message_log (logged_at, operation, filename, level, message)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(unix_timestamp())
        .bind(operation)
        .bind(filename)
        .bind(level)
        .bind(message)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Stage a retrieved payload. Upsert keyed by filename; the stored
    /// payload is replaced only when the content actually changed, so
    /// re-downloading an unchanged hour is a no-op (content-level dedup).
    pub async fn stage_file(
        &mut self,
        filename: &str,
        component: &str,
        observed_hour: &NaiveDateTime,
        payload: &[u8],
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO import_files (filename, component, observed_hour, payload, imported_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(filename) DO UPDATE SET
                payload = excluded.payload,
                imported_at = excluded.imported_at
            WHERE import_files.payload <> excluded.payload
            "#,
        )
        .bind(filename)
        .bind(component)
        .bind(format_hour(observed_hour))
        .bind(payload)
        .bind(unix_timestamp())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Make the sweep's writes durable as one unit.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
