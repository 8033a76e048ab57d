//! archivist-reconcile: duplicate meeting auditor
//!
//! Preview is the default and writes nothing. `--apply` requires the digest
//! printed by a preview and refuses to run if the plan has changed since.
//!
//! Exit codes: 0 success, 1 configuration error, 2 missing or stale plan
//! digest, 4 database error.

use anyhow::Result;
use archivist_common::config::{
    config_file_path, load_toml_config, resolve_database_url, DEFAULT_MAX_LOCK_WAIT_MS,
};
use archivist_common::logging::{init_tracing, LogFormat};
use archivist_reconcile::{Auditor, NaturalKey, ReconcileError};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_CONFIG: u8 = 1;
const EXIT_DIGEST: u8 = 2;
const EXIT_DATABASE: u8 = 4;

/// Command-line arguments for archivist-reconcile
#[derive(Parser, Debug)]
#[command(name = "archivist-reconcile")]
#[command(about = "Find and merge duplicate meetings in an archivist database")]
#[command(version)]
struct Args {
    /// Natural key to group by: meeting or meeting-date-host
    #[arg(long, default_value = "meeting")]
    key: NaturalKey,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite connection string
    #[arg(long)]
    database_url: Option<String>,

    /// Perform the merge (default is preview only)
    #[arg(long, requires = "plan_digest")]
    apply: bool,

    /// Digest printed by the preview being applied
    #[arg(long)]
    plan_digest: Option<String>,

    /// Log and report format: text or json
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Debug-level logging (RUST_LOG still wins)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (format, auditor) = match setup(&args).await {
        Ok(ready) => ready,
        Err(e) => {
            eprintln!("archivist-reconcile: {:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let outcome = match (args.apply, args.plan_digest.as_deref()) {
        (true, Some(digest)) => auditor.apply(args.key, digest).await.map(|report| {
            match format {
                LogFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&report).unwrap_or_default()
                ),
                LogFormat::Text => println!(
                    "Merged {} group(s): {} meeting(s) deleted, {} agenda item(s) reassigned, {} dropped as already present",
                    report.groups.len(),
                    report.meetings_deleted(),
                    report.children_reassigned(),
                    report.children_dropped()
                ),
            }
        }),
        _ => auditor.preview(args.key).await.map(|plan| match format {
            LogFormat::Json => println!(
                "{}",
                serde_json::json!({"plan": plan, "digest": plan.digest()})
            ),
            LogFormat::Text => {
                print!("{}", plan);
                if !plan.is_empty() {
                    println!(
                        "Apply with: archivist-reconcile --key {} --apply --plan-digest {}",
                        plan.key,
                        plan.digest()
                    );
                }
            }
        }),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ ReconcileError::DigestMismatch { .. }) => {
            error!("{}", e);
            eprintln!("archivist-reconcile: {}", e);
            ExitCode::from(EXIT_DIGEST)
        }
        Err(e) => {
            error!(error_type = "database", "{}", e);
            eprintln!("archivist-reconcile: {}", e);
            ExitCode::from(EXIT_DATABASE)
        }
    }
}

async fn setup(args: &Args) -> Result<(LogFormat, Auditor)> {
    let config_path = config_file_path(args.config.as_deref());
    let toml_config = load_toml_config(config_path.as_deref())?;

    let format = args
        .log_format
        .or(toml_config.logging.format)
        .unwrap_or_default();
    init_tracing(format, toml_config.logging.level.as_deref(), args.verbose)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        apply = args.apply,
        "Starting archivist-reconcile"
    );

    let database_url = resolve_database_url(args.database_url.as_deref(), &toml_config)?;
    let pool = archivist_common::db::init_database(&database_url).await?;
    let max_lock_wait_ms = toml_config
        .max_lock_wait_ms
        .unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS);

    Ok((format, Auditor::new(pool, max_lock_wait_ms)))
}
