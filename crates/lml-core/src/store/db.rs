//! Connection handling and migrations for the import database.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Percent-encode a path for use in a sqlite:// URI so spaces and special
/// characters don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite import database.
///
/// The default database file lives under the XDG state directory:
/// `~/.local/state/lml/import.db`.
#[derive(Clone)]
pub struct ImportStore {
    pub(crate) pool: Pool<Sqlite>,
}

/// Schema of the import area. Append-only tables (`download_failures`,
/// `message_log`) are never pruned by this subsystem; aging out of the
/// retry window is the only lifecycle there.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS configuration (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sensors (
        code TEXT PRIMARY KEY,
        download_enabled INTEGER NOT NULL DEFAULT 0
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS download_failures (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS message_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        logged_at INTEGER NOT NULL,
        operation TEXT NOT NULL,
        filename TEXT NOT NULL,
        level TEXT NOT NULL,
        message TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS import_files (
        filename TEXT PRIMARY KEY,
        component TEXT NOT NULL,
        observed_hour TEXT NOT NULL,
        payload BLOB NOT NULL,
        imported_at INTEGER NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS series (
        component TEXT PRIMARY KEY,
        first_hour TEXT NOT NULL,
        last_hour TEXT NOT NULL,
        file_count INTEGER NOT NULL,
        refreshed_at INTEGER NOT NULL
    );
    "#,
];

impl ImportStore {
    /// Open (or create) the default import database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("lml")?;
        let state_dir = xdg_dirs.get_state_home().join("lml");
        let db_path = state_dir.join("import.db");

        tokio::fs::create_dir_all(&state_dir).await?;

        let uri = path_to_sqlite_uri(&db_path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await?;

        let store = ImportStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open (or create) the database at a specific path. Creates parent
    /// directories if needed; used when the bootstrap config overrides the
    /// location and by tests.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await?;
        let store = ImportStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Current time as Unix seconds (for DB timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<ImportStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = ImportStore { pool };
    store.migrate().await?;
    Ok(store)
}
