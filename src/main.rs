//! Application entry point for the `device-status-ingest` batch job.
//!
//! This binary runs one load of the device status summary table:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening a single database connection
//! - Handing the source folder to `ingest::process_directory`
//! - Releasing the connection whether the run succeeded or failed
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – storage connection string (`SQL_URI` also read)
//! - `SOURCE_DIR` (optional) – folder to scan, unless given as an argument
//! - `REGION_MARKER` (optional) – filename filter substring (default: `Chile`)
//! - `INGEST_LOG_LEVEL` (optional) – log verbosity (default: `info`)
use std::{env, io::IsTerminal, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;

use device_status_ingest::{config, process_directory, SummaryStore};

/// Load daily device online/offline summaries from report files
#[derive(Parser, Debug)]
#[command(name = "device-status-ingest", version)]
struct Cli {
    /// Folder containing the report files (overrides SOURCE_DIR)
    source_dir: Option<PathBuf>,

    /// Substring a filename must contain to be processed (overrides REGION_MARKER)
    #[arg(long)]
    region: Option<String>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

// ---

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ---
    let cli = Cli::parse();
    dotenv().ok();
    init_tracing();

    let mut cfg = config::load_from_env()?;
    if let Some(dir) = cli.source_dir {
        cfg.source_dir = Some(dir);
    }
    if let Some(region) = cli.region {
        cfg.region_marker = region;
    }
    cfg.log_config();

    let source_dir = cfg
        .source_dir
        .clone()
        .ok_or_else(|| anyhow!("SOURCE_DIR must be set in .env, environment, or as an argument"))?;

    let store = SummaryStore::connect(&cfg.db_url, cfg.connect_timeout())
        .await
        .map_err(|e| {
            anyhow!(
                "Failed to connect to database '{}': {}",
                config::mask_db_url(&cfg.db_url),
                e
            )
        })?;

    tracing::info!("Processing {}", source_dir.display());
    let outcome = process_directory(&source_dir, &store, &cfg.region_marker).await;
    store.close().await;

    let report = outcome?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Log level from `RUST_LOG` if set, else `INGEST_LOG_LEVEL` (default `info`)
///
/// Must be called once before any tracing macros are invoked.
fn init_tracing() {
    // ---
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("INGEST_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        // ---
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_overrides() {
        // ---
        let cli = Cli::try_parse_from([
            "device-status-ingest",
            "/srv/acs_reports",
            "--region",
            "Peru",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.source_dir, Some(PathBuf::from("/srv/acs_reports")));
        assert_eq!(cli.region.as_deref(), Some("Peru"));
        assert!(cli.json);

        let bare = Cli::try_parse_from(["device-status-ingest"]).unwrap();
        assert_eq!(bare.source_dir, None);
        assert_eq!(bare.region, None);
        assert!(!bare.json);
    }
}
