//! archivist-ingest: command-line front-end for the ingestion pipeline
//!
//! Exit codes: 0 success, 1 configuration error, 2 validation errors,
//! 3 network errors, 4 database errors. With several kinds in one run the
//! most severe wins (database > network > validation).

use archivist_common::config::{
    config_file_path, load_toml_config, resolve_database_url, resolve_http_timeout_secs,
    DEFAULT_MAX_LOCK_WAIT_MS,
};
use archivist_common::logging::{init_tracing, LogFormat};
use archivist_ingest::db::runs::list_recent_runs;
use archivist_ingest::error::{ConfigurationError, IngestError};
use archivist_ingest::models::Source;
use archivist_ingest::services::{
    DriverOptions, HttpFetcher, MultiSourceDriver, SampleStrategy,
};
use archivist_ingest::sources::DEFAULT_SOURCES;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments for archivist-ingest
#[derive(Parser, Debug)]
#[command(name = "archivist-ingest")]
#[command(about = "Ingest meeting summary archives into a relational store")]
#[command(version)]
struct Args {
    /// Source URLs in processing order (defaults to the built-in yearly archives)
    sources: Vec<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite connection string
    #[arg(long)]
    database_url: Option<String>,

    /// Download, validate and normalize only; write nothing
    #[arg(long)]
    dry_run: bool,

    /// Debug-level logging (RUST_LOG still wins)
    #[arg(short, long)]
    verbose: bool,

    /// Log output format: text or json
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// HTTP timeout per source download, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Structure-check every record instead of the first of each source
    #[arg(long)]
    validate_all: bool,

    /// Print the most recent runs from the run history and exit
    #[arg(long, value_name = "N")]
    list_runs: Option<i64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error_type = %e.error_type(), "{}", e);
            eprintln!("archivist-ingest: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Failures before the driver starts are configuration errors; reading run
/// history is the one storage failure that surfaces here
async fn run(args: Args) -> Result<u8, IngestError> {
    let config_path = config_file_path(args.config.as_deref());
    let toml_config = load_toml_config(config_path.as_deref()).map_err(ConfigurationError::from)?;

    let log_format = args
        .log_format
        .or(toml_config.logging.format)
        .unwrap_or_default();
    init_tracing(log_format, toml_config.logging.level.as_deref(), args.verbose)
        .map_err(ConfigurationError::from)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting archivist-ingest"
    );
    if let Some(path) = &config_path {
        info!(config = %path.display(), "Configuration file loaded");
    }

    let timeout_secs = resolve_http_timeout_secs(args.timeout_secs, &toml_config)
        .map_err(ConfigurationError::from)?;

    let options = DriverOptions {
        sample_strategy: if args.validate_all || toml_config.validate_all_records == Some(true) {
            SampleStrategy::AllRecords
        } else {
            SampleStrategy::FirstRecord
        },
        max_lock_wait_ms: toml_config
            .max_lock_wait_ms
            .unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS),
    };

    if let Some(limit) = args.list_runs {
        let database_url = resolve_database_url(args.database_url.as_deref(), &toml_config)
            .map_err(ConfigurationError::from)?;
        let pool = archivist_common::db::init_database(&database_url)
            .await
            .map_err(ConfigurationError::from)?;
        for (run_id, state, started_at) in list_recent_runs(&pool, limit).await? {
            println!("{}  {:<9}  {}", started_at, state, run_id);
        }
        return Ok(0);
    }

    let urls: Vec<String> = if !args.sources.is_empty() {
        args.sources
    } else if let Some(sources) = toml_config.sources.clone().filter(|s| !s.is_empty()) {
        sources
    } else {
        DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
    };
    let sources = Source::from_urls(urls);

    let fetcher = Arc::new(
        HttpFetcher::new(timeout_secs)
            .map_err(|e| ConfigurationError(format!("Cannot build HTTP client: {}", e)))?,
    );

    let mut driver = if args.dry_run {
        info!("Dry run: no database writes");
        MultiSourceDriver::dry_run(fetcher, options)
    } else {
        let database_url = resolve_database_url(args.database_url.as_deref(), &toml_config)
            .map_err(ConfigurationError::from)?;
        let pool = archivist_common::db::init_database(&database_url)
            .await
            .map_err(ConfigurationError::from)?;
        MultiSourceDriver::new(pool, fetcher, options)
    };

    let summary = driver.run(&sources).await;

    match log_format {
        LogFormat::Json => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!(error = %e, "Cannot serialize run summary"),
        },
        LogFormat::Text => print!("{}", summary),
    }

    Ok(summary.exit_code())
}
