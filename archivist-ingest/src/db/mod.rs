//! Database access for archivist-ingest
//!
//! Every write is an UPSERT keyed by `id` and runs on a connection borrowed
//! from a caller-owned transaction. `created_at` is written once; every touch
//! refreshes `updated_at`.

pub mod agenda;
pub mod meetings;
pub mod runs;
pub mod workgroups;

use crate::models::EntityKind;
use archivist_common::Result;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Whether an UPSERT created the row or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl UpsertOutcome {
    pub fn existed(&self) -> bool {
        matches!(self, UpsertOutcome::Updated)
    }
}

/// Whether a row with `id` is already present in the table backing `kind`
pub(crate) async fn row_exists(conn: &mut SqliteConnection, kind: EntityKind, id: Uuid) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)", kind.table());
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

fn outcome(existed: bool) -> UpsertOutcome {
    if existed {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    }
}
