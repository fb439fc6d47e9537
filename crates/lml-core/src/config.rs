//! Configuration: local bootstrap file plus the immutable run configuration
//! resolved once from the import database.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::store::ImportStore;

/// Configuration keys resolved from the `configuration` table at startup.
pub mod keys {
    /// Base address of the archive server, e.g. `http://lml.example.net`.
    pub const SERVER: &str = "lml.server.httpaddress";
    /// Path on the server holding the hourly files, e.g. `/sos/`.
    pub const DIRECTORY: &str = "lml.server.directory";
    /// Per-request timeout in seconds (fractional allowed).
    pub const HTTP_TIMEOUT: &str = "http.timeout";
    /// Inter-request pacing for the retry sweep, in seconds.
    pub const RETRY_WAIT: &str = "http.retrywait";
    /// Optional forward proxy, applied process-wide.
    pub const PROXY: &str = "http.proxy";
    /// Default lookback for the regular sweep, in hours.
    pub const TIMEFRAME: &str = "lml.retrieve.timeframe";
    /// Default lookback for the retry sweep, in hours. Zero disables retries.
    pub const RETRY_TIMEFRAME: &str = "lml.retrieve.retrytimeframe";
}

/// Local bootstrap configuration (`~/.config/lml/config.toml`).
///
/// Only holds what is needed to reach the import database; all run
/// parameters live in the database itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Path to the SQLite import database. Defaults to the XDG state dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("lml")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load the bootstrap configuration from disk, creating a default file if
/// none exists.
pub fn load_or_init() -> Result<LocalConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = LocalConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: LocalConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Immutable run configuration. Resolved once at startup; never changes for
/// the duration of a run, so every component can be handed a reference.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub server: String,
    pub base_path: String,
    pub http_timeout: Duration,
    pub retry_pace: Duration,
    pub proxy: Option<String>,
    pub timeframe_hours: i64,
    pub retry_timeframe_hours: i64,
}

impl RunConfig {
    /// Resolve the run configuration from the database. A missing mandatory
    /// key is fatal; only the proxy is optional.
    pub async fn resolve(store: &ImportStore) -> Result<RunConfig> {
        async fn required(store: &ImportStore, key: &str) -> Result<String> {
            store
                .config_value(key)
                .await?
                .ok_or_else(|| anyhow!("missing configuration key {key}"))
        }

        let server = required(store, keys::SERVER).await?;
        let base_path = required(store, keys::DIRECTORY).await?;

        let timeout_secs: f64 = required(store, keys::HTTP_TIMEOUT)
            .await?
            .parse()
            .with_context(|| format!("{} is not a number", keys::HTTP_TIMEOUT))?;
        let retry_wait_secs: f64 = required(store, keys::RETRY_WAIT)
            .await?
            .parse()
            .with_context(|| format!("{} is not a number", keys::RETRY_WAIT))?;
        let timeframe_hours: i64 = required(store, keys::TIMEFRAME)
            .await?
            .parse()
            .with_context(|| format!("{} is not an integer", keys::TIMEFRAME))?;
        let retry_timeframe_hours: i64 = required(store, keys::RETRY_TIMEFRAME)
            .await?
            .parse()
            .with_context(|| format!("{} is not an integer", keys::RETRY_TIMEFRAME))?;

        Ok(RunConfig {
            server,
            base_path,
            http_timeout: Duration::from_secs_f64(timeout_secs.max(0.0)),
            retry_pace: Duration::from_secs_f64(retry_wait_secs.max(0.0)),
            proxy: store.config_value(keys::PROXY).await?,
            timeframe_hours,
            retry_timeframe_hours,
        })
    }

    /// Export the configured proxy to the process environment so libcurl
    /// picks it up for every request. Call once, before the first fetch.
    pub fn apply_proxy(&self) {
        if let Some(proxy) = &self.proxy {
            std::env::set_var("http_proxy", proxy);
            std::env::set_var("https_proxy", proxy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_config_toml_roundtrip() {
        let cfg = LocalConfig {
            database_path: Some(PathBuf::from("/var/lib/lml/import.db")),
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: LocalConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.database_path, cfg.database_path);
    }

    #[test]
    fn local_config_defaults_to_no_path() {
        let parsed: LocalConfig = toml::from_str("").unwrap();
        assert!(parsed.database_path.is_none());
    }

    async fn seeded_store() -> ImportStore {
        let store = crate::store::open_memory().await.unwrap();
        store
            .set_config_value(keys::SERVER, "http://lml.example.net")
            .await
            .unwrap();
        store.set_config_value(keys::DIRECTORY, "/sos/").await.unwrap();
        store.set_config_value(keys::HTTP_TIMEOUT, "5").await.unwrap();
        store.set_config_value(keys::RETRY_WAIT, "0.05").await.unwrap();
        store.set_config_value(keys::TIMEFRAME, "3").await.unwrap();
        store.set_config_value(keys::RETRY_TIMEFRAME, "24").await.unwrap();
        store
    }

    #[tokio::test]
    async fn resolve_reads_every_key_once() {
        let store = seeded_store().await;
        let cfg = RunConfig::resolve(&store).await.unwrap();
        assert_eq!(cfg.server, "http://lml.example.net");
        assert_eq!(cfg.base_path, "/sos/");
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));
        assert_eq!(cfg.retry_pace, Duration::from_millis(50));
        assert_eq!(cfg.timeframe_hours, 3);
        assert_eq!(cfg.retry_timeframe_hours, 24);
        assert!(cfg.proxy.is_none());
    }

    #[tokio::test]
    async fn resolve_picks_up_optional_proxy() {
        let store = seeded_store().await;
        store
            .set_config_value(keys::PROXY, "http://proxy.example.net:3128")
            .await
            .unwrap();
        let cfg = RunConfig::resolve(&store).await.unwrap();
        assert_eq!(cfg.proxy.as_deref(), Some("http://proxy.example.net:3128"));
    }

    #[tokio::test]
    async fn resolve_fails_on_missing_mandatory_key() {
        let store = crate::store::open_memory().await.unwrap();
        let err = RunConfig::resolve(&store).await.unwrap_err();
        assert!(err.to_string().contains(keys::SERVER));
    }

    #[tokio::test]
    async fn resolve_fails_on_non_numeric_timeout() {
        let store = seeded_store().await;
        store
            .set_config_value(keys::HTTP_TIMEOUT, "soon")
            .await
            .unwrap();
        let err = RunConfig::resolve(&store).await.unwrap_err();
        assert!(err.to_string().contains(keys::HTTP_TIMEOUT));
    }
}
