//! CLI for the LML retrieval run.

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};

use lml_core::config::{self, RunConfig};
use lml_core::fetch;
use lml_core::run;
use lml_core::store::ImportStore;

const LONG_ABOUT: &str = "\
Retrieve hourly LML measurement files into the SOS import database.

With no arguments both lookbacks come from the configuration table.
Passing TIMEFRAME and RETRY_TIMEFRAME overrides both for this run.

  TIMEFRAME        Hours back from now to download data for. Downloads may
                   overlap with previous runs; retrieved data is checked
                   for differences and never imported twice.
  RETRY_TIMEFRAME  Hours back from now to re-attempt previously failed
                   downloads (logged failures only). The webserver is
                   queried a little slower and with a more forgiving
                   timeout. 0 disables retries.";

/// Top-level CLI for the retrieval run.
#[derive(Debug, Parser)]
#[command(name = "lml-retrieve")]
#[command(about = "Retrieve LML measurement files into the import database")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    /// Hours back from now to download (overrides the configured default).
    #[arg(value_name = "TIMEFRAME", requires = "retry_timeframe")]
    pub timeframe: Option<i64>,

    /// Hours back from now to retry failed downloads; 0 disables retries.
    #[arg(value_name = "RETRY_TIMEFRAME")]
    pub retry_timeframe: Option<i64>,
}

pub async fn run_from_args() -> Result<()> {
    // The literal word `help` prints usage and exits without touching the
    // database (no side effects, not even config-file creation).
    let mut args = std::env::args();
    if args.nth(1).as_deref() == Some("help") {
        Cli::command().print_long_help()?;
        return Ok(());
    }

    let cli = Cli::parse();
    execute(cli).await
}

async fn execute(cli: Cli) -> Result<()> {
    let local = config::load_or_init()?;
    let store = match &local.database_path {
        Some(path) => ImportStore::open_at(path).await?,
        None => ImportStore::open_default().await?,
    };

    let resolved = RunConfig::resolve(&store).await?;
    resolved.apply_proxy();

    // Either both lookbacks from the command line, or both from config.
    let run_config = match (cli.timeframe, cli.retry_timeframe) {
        (Some(timeframe), Some(retry_timeframe)) => RunConfig {
            timeframe_hours: timeframe,
            retry_timeframe_hours: retry_timeframe,
            ..resolved
        },
        _ => resolved,
    };
    if run_config.timeframe_hours < 0 || run_config.retry_timeframe_hours < 0 {
        bail!("timeframes must be non-negative");
    }

    let now = chrono::Local::now().naive_local();
    let server = run_config.server.clone();
    let base_path = run_config.base_path.clone();
    let mut fetcher = move |filename: &str, timeout: std::time::Duration| {
        fetch::fetch_file(&server, &base_path, filename, timeout)
    };

    let report = run::execute_run(&store, &run_config, now, &mut fetcher).await?;

    tracing::info!(
        "run complete: {} stored, {} failed, {} retried",
        report.stored,
        report.failed,
        report.retried
    );
    println!(
        "downloaded {} of {} attempts ({} failed, {} retried){}",
        report.stored,
        report.attempted,
        report.failed,
        report.retried,
        if report.series_refreshed {
            ", series metadata updated"
        } else {
            ""
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests;
