//! Versioned schema migrations
//!
//! Base tables are created by `init::create_schema`; migrations layer
//! indexes and later changes on top. Each version is a list of idempotent
//! statements applied in one transaction, then recorded in `schema_version`.
//! Published versions are never edited: a schema change is a new entry.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Highest version in [`MIGRATIONS`]
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// `(version, description, statements)` in ascending version order
const MIGRATIONS: &[(i32, &str, &[&str])] = &[
    (
        1,
        "natural-key index on meetings",
        // Non-unique: duplicates are tolerated at write time and repaired by
        // the reconcile tool.
        &["CREATE INDEX IF NOT EXISTS idx_meetings_natural_key \
           ON meetings (workgroup_id, date, host, purpose)"],
    ),
    (
        2,
        "parent-id indexes on child tables",
        &[
            "CREATE INDEX IF NOT EXISTS idx_agenda_items_meeting ON agenda_items (meeting_id)",
            "CREATE INDEX IF NOT EXISTS idx_action_items_agenda_item ON action_items (agenda_item_id)",
            "CREATE INDEX IF NOT EXISTS idx_decision_items_agenda_item ON decision_items (agenda_item_id)",
            "CREATE INDEX IF NOT EXISTS idx_discussion_points_agenda_item ON discussion_points (agenda_item_id)",
        ],
    ),
];

/// Highest applied version, or 0 for a database that predates versioning
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
    )
    .fetch_one(pool)
    .await?;

    if !has_table {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

/// Apply every migration newer than the stored version
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let from = get_schema_version(pool).await?;

    if from > CURRENT_SCHEMA_VERSION {
        warn!(
            stored = from,
            supported = CURRENT_SCHEMA_VERSION,
            "Database schema is newer than this build; leaving it untouched"
        );
        return Ok(());
    }

    for (version, description, statements) in MIGRATIONS.iter().filter(|(v, _, _)| *v > from) {
        let mut tx = pool.begin().await?;
        for statement in statements.iter() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
            .bind(*version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(version, description, "Applied schema migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::{connect, create_schema};

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = connect("sqlite::memory:").await.unwrap();
        create_schema(&pool).await.unwrap();

        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);

        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

        let index_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(index_count, 5);
    }
}
