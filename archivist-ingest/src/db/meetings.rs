//! Meeting persistence

use super::{outcome, row_exists, UpsertOutcome};
use crate::models::{EntityKind, NormalizedMeeting};
use archivist_common::Result;
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Meeting row as stored (JSON columns left as text)
#[derive(Debug, Clone)]
pub struct MeetingRow {
    pub id: String,
    pub workgroup_id: String,
    pub date: String,
    pub meeting_type: Option<String>,
    pub host: Option<String>,
    pub documenter: Option<String>,
    pub purpose: Option<String>,
    pub attendees: String,
    pub video_links: String,
    pub raw_json: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Insert or overwrite a meeting row; children are written separately
pub async fn upsert_meeting(
    conn: &mut SqliteConnection,
    meeting: &NormalizedMeeting,
    now: &str,
) -> Result<UpsertOutcome> {
    let existed = row_exists(conn, EntityKind::Meeting, meeting.id).await?;

    sqlx::query(
        r#"
        INSERT INTO meetings (
            id, workgroup_id, date, type, host, documenter, purpose,
            attendees, video_links, working_docs, timestamped_video, tags,
            raw_json, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            workgroup_id = excluded.workgroup_id,
            date = excluded.date,
            type = excluded.type,
            host = excluded.host,
            documenter = excluded.documenter,
            purpose = excluded.purpose,
            attendees = excluded.attendees,
            video_links = excluded.video_links,
            working_docs = excluded.working_docs,
            timestamped_video = excluded.timestamped_video,
            tags = excluded.tags,
            raw_json = excluded.raw_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(meeting.id.to_string())
    .bind(meeting.workgroup_id.to_string())
    .bind(meeting.date_string())
    .bind(&meeting.meeting_type)
    .bind(&meeting.host)
    .bind(&meeting.documenter)
    .bind(&meeting.purpose)
    .bind(Value::from(meeting.attendees.clone()).to_string())
    .bind(Value::from(meeting.video_links.clone()).to_string())
    .bind(json_column(&meeting.working_docs))
    .bind(json_column(&meeting.timestamped_video))
    .bind(json_column(&meeting.tags))
    .bind(meeting.raw_json.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(outcome(existed))
}

/// Load meeting by id
pub async fn load_meeting(pool: &SqlitePool, id: Uuid) -> Result<Option<MeetingRow>> {
    let row = sqlx::query(
        r#"
        SELECT id, workgroup_id, date, type, host, documenter, purpose,
               attendees, video_links, raw_json, created_at, updated_at
        FROM meetings
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| MeetingRow {
        id: row.get("id"),
        workgroup_id: row.get("workgroup_id"),
        date: row.get("date"),
        meeting_type: row.get("type"),
        host: row.get("host"),
        documenter: row.get("documenter"),
        purpose: row.get("purpose"),
        attendees: row.get("attendees"),
        video_links: row.get("video_links"),
        raw_json: row.get("raw_json"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

/// NULL for absent nested JSON, verbatim text otherwise
fn json_column(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
