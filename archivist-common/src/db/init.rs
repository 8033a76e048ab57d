//! Database initialization
//!
//! Opens the SQLite pool, creates every table if missing, then runs the
//! versioned migrations. Safe to call on every startup.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Busy timeout applied to every connection before lock retries kick in
const BUSY_TIMEOUT_MS: u64 = 250;

/// Open a pool for `database_url`
///
/// A malformed URL or a database that cannot be opened is reported as
/// [`Error::Config`]: nothing can run without storage.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    crate::config::validate_database_url(database_url)?;

    let in_memory = is_in_memory(database_url);

    let mut options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| Error::Config(format!("Invalid database URL '{}': {}", database_url, e)))?
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    if !in_memory {
        options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
    }

    // Every connection to ":memory:" is its own database, so in-memory pools
    // hold exactly one connection for their whole lifetime.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| Error::Config(format!("Cannot open database '{}': {}", database_url, e)))?;

    debug!(in_memory, "Database pool opened");
    Ok(pool)
}

/// Open the pool and bring the schema up to date
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let pool = connect(database_url).await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    info!("Database ready");
    Ok(pool)
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_workgroups_table(pool).await?;
    create_meetings_table(pool).await?;
    create_agenda_items_table(pool).await?;
    create_action_items_table(pool).await?;
    create_decision_items_table(pool).await?;
    create_discussion_points_table(pool).await?;
    create_ingest_runs_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_workgroups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS workgroups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            raw_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Meetings: flat columns, JSON array/object columns, and the original payload
async fn create_meetings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meetings (
            id TEXT PRIMARY KEY,
            workgroup_id TEXT NOT NULL REFERENCES workgroups(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            type TEXT,
            host TEXT,
            documenter TEXT,
            purpose TEXT,
            attendees TEXT NOT NULL DEFAULT '[]',
            video_links TEXT NOT NULL DEFAULT '[]',
            working_docs TEXT,
            timestamped_video TEXT,
            tags TEXT,
            raw_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_agenda_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agenda_items (
            id TEXT PRIMARY KEY,
            meeting_id TEXT NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
            status TEXT,
            order_index INTEGER NOT NULL,
            raw_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_action_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS action_items (
            id TEXT PRIMARY KEY,
            agenda_item_id TEXT NOT NULL REFERENCES agenda_items(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            assignee TEXT,
            due_date TEXT,
            status TEXT,
            position_index INTEGER NOT NULL,
            raw_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_decision_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS decision_items (
            id TEXT PRIMARY KEY,
            agenda_item_id TEXT NOT NULL REFERENCES agenda_items(id) ON DELETE CASCADE,
            decision TEXT NOT NULL,
            rationale TEXT,
            opposing TEXT,
            effect TEXT,
            position_index INTEGER NOT NULL,
            raw_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_discussion_points_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS discussion_points (
            id TEXT PRIMARY KEY,
            agenda_item_id TEXT NOT NULL REFERENCES agenda_items(id) ON DELETE CASCADE,
            point TEXT NOT NULL,
            position_index INTEGER NOT NULL,
            raw_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Run history, one row per non-dry ingestion run
async fn create_ingest_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            sources TEXT NOT NULL DEFAULT '[]',
            summary TEXT,
            started_at TEXT NOT NULL,
            ended_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
