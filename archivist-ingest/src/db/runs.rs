//! Run history persistence
//!
//! One `ingest_runs` row per non-dry run: inserted as `running` when the run
//! starts, finished with the serialized summary when it ends.

use crate::models::{RunOutcome, RunSummary, Source};
use archivist_common::db::retry_on_lock;
use archivist_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a persisted run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Completed,
    Partial,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Partial => "partial",
            RunState::Failed => "failed",
        }
    }
}

impl From<RunOutcome> for RunState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Success => RunState::Completed,
            RunOutcome::PartialSuccess => RunState::Partial,
            RunOutcome::Failure => RunState::Failed,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(RunState::Running),
            "completed" => Ok(RunState::Completed),
            "partial" => Ok(RunState::Partial),
            "failed" => Ok(RunState::Failed),
            other => Err(Error::Internal(format!("Unknown run state '{}'", other))),
        }
    }
}

/// Persisted run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub state: RunState,
    pub sources: Vec<String>,
    pub summary: Option<RunSummary>,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// Record the start of a run
pub async fn insert_run(
    pool: &SqlitePool,
    summary: &RunSummary,
    sources: &[Source],
    max_wait_ms: u64,
) -> Result<()> {
    let run_id = summary.run_id.to_string();
    let urls: Vec<&str> = sources.iter().map(|s| s.url.as_str()).collect();
    let sources_json = serde_json::to_string(&urls)
        .map_err(|e| Error::Internal(format!("Failed to serialize sources: {}", e)))?;
    let started_at = archivist_common::time::to_db_string(summary.started_at);

    retry_on_lock("insert_run", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO ingest_runs (run_id, state, sources, started_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&run_id)
        .bind(RunState::Running.as_str())
        .bind(&sources_json)
        .bind(&started_at)
        .execute(pool)
        .await?;

        Ok::<(), Error>(())
    })
    .await
}

/// Store the final state and summary of a run
pub async fn finish_run(pool: &SqlitePool, summary: &RunSummary, max_wait_ms: u64) -> Result<()> {
    let run_id = summary.run_id.to_string();
    let state = RunState::from(summary.outcome());
    let summary_json = serde_json::to_string(summary)
        .map_err(|e| Error::Internal(format!("Failed to serialize summary: {}", e)))?;
    let ended_at = summary
        .ended_at
        .map(archivist_common::time::to_db_string)
        .unwrap_or_else(archivist_common::time::now_string);

    retry_on_lock("finish_run", max_wait_ms, || async {
        sqlx::query(
            r#"
            UPDATE ingest_runs
            SET state = ?, summary = ?, ended_at = ?
            WHERE run_id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(&summary_json)
        .bind(&ended_at)
        .bind(&run_id)
        .execute(pool)
        .await?;

        Ok::<(), Error>(())
    })
    .await
}

/// Load a run by id
pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<RunRecord>> {
    let row = sqlx::query(
        r#"
        SELECT run_id, state, sources, summary, started_at, ended_at
        FROM ingest_runs
        WHERE run_id = ?
        "#,
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let state_str: String = row.get("state");
    let sources_json: String = row.get("sources");
    let summary_json: Option<String> = row.get("summary");

    let sources: Vec<String> = serde_json::from_str(&sources_json)
        .map_err(|e| Error::Internal(format!("Failed to parse run sources: {}", e)))?;
    let summary = summary_json
        .map(|json| serde_json::from_str::<RunSummary>(&json))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse run summary: {}", e)))?;

    Ok(Some(RunRecord {
        run_id,
        state: state_str.parse()?,
        sources,
        summary,
        started_at: row.get("started_at"),
        ended_at: row.get("ended_at"),
    }))
}

/// Most recent runs first
pub async fn list_recent_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<(Uuid, RunState, String)>> {
    let rows = sqlx::query(
        "SELECT run_id, state, started_at FROM ingest_runs ORDER BY started_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let id: String = row.get("run_id");
            let state: String = row.get("state");
            let run_id = Uuid::parse_str(&id)
                .map_err(|e| Error::Internal(format!("Invalid run id '{}': {}", id, e)))?;
            Ok((run_id, state.parse()?, row.get("started_at")))
        })
        .collect()
}
