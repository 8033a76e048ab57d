//! Workgroup persistence

use super::{outcome, row_exists, UpsertOutcome};
use crate::models::{EntityKind, NormalizedWorkgroup};
use archivist_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Workgroup row as stored
#[derive(Debug, Clone)]
pub struct WorkgroupRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Insert or overwrite a workgroup
pub async fn upsert_workgroup(
    conn: &mut SqliteConnection,
    workgroup: &NormalizedWorkgroup,
    now: &str,
) -> Result<UpsertOutcome> {
    let existed = row_exists(conn, EntityKind::Workgroup, workgroup.id).await?;

    sqlx::query(
        r#"
        INSERT INTO workgroups (id, name, raw_json, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            raw_json = excluded.raw_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(workgroup.id.to_string())
    .bind(&workgroup.name)
    .bind(workgroup.raw_json.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(outcome(existed))
}

/// Load workgroup by id
pub async fn load_workgroup(pool: &SqlitePool, id: Uuid) -> Result<Option<WorkgroupRow>> {
    let row = sqlx::query(
        "SELECT id, name, created_at, updated_at FROM workgroups WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| WorkgroupRow {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}
