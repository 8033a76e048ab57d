//! Queries and writes used by the auditor

use crate::natural_key::NaturalKey;
use archivist_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;

/// Meeting row as seen by the auditor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRef {
    pub id: String,
    pub created_at: String,
}

/// Meetings sharing one natural key, oldest first (ties broken by id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub key_values: Vec<String>,
    pub members: Vec<MeetingRef>,
}

impl DuplicateGroup {
    pub fn survivor(&self) -> &MeetingRef {
        &self.members[0]
    }

    pub fn losers(&self) -> &[MeetingRef] {
        &self.members[1..]
    }
}

/// Every natural key held by more than one meeting, in key order
pub async fn find_duplicate_groups(pool: &SqlitePool, key: NaturalKey) -> Result<Vec<DuplicateGroup>> {
    let rows = sqlx::query(
        r#"
        SELECT id, workgroup_id, date,
               TRIM(COALESCE(host, '')) AS host,
               TRIM(COALESCE(purpose, '')) AS purpose,
               created_at
        FROM meetings
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut by_key: BTreeMap<Vec<String>, Vec<MeetingRef>> = BTreeMap::new();
    for row in rows {
        let workgroup_id: String = row.get("workgroup_id");
        let date: String = row.get("date");
        let host: String = row.get("host");
        let purpose: String = row.get("purpose");

        by_key
            .entry(key.values(&workgroup_id, &date, &host, &purpose))
            .or_default()
            .push(MeetingRef {
                id: row.get("id"),
                created_at: row.get("created_at"),
            });
    }

    Ok(by_key
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key_values, mut members)| {
            members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            DuplicateGroup {
                key_values,
                members,
            }
        })
        .collect())
}

/// Move a loser's agenda items under the survivor; returns rows moved
///
/// Only items whose `order_index` is still free under the survivor move.
/// The rest describe positions the survivor already holds and are left to
/// cascade away with the loser.
pub async fn reassign_children(conn: &mut SqliteConnection, loser_id: &str, survivor_id: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE agenda_items SET meeting_id = ?
        WHERE meeting_id = ?
          AND order_index NOT IN (SELECT order_index FROM agenda_items WHERE meeting_id = ?)
        "#,
    )
    .bind(survivor_id)
    .bind(loser_id)
    .bind(survivor_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn count_agenda_items(conn: &mut SqliteConnection, meeting_id: &str) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM agenda_items WHERE meeting_id = ?")
        .bind(meeting_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count as u64)
}

pub async fn delete_meeting(conn: &mut SqliteConnection, id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM meetings WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
