//! Agenda items and their children: action items, decision items, discussion points

use super::{outcome, row_exists, UpsertOutcome};
use crate::models::{
    EntityKind, NormalizedActionItem, NormalizedAgendaItem, NormalizedDecisionItem,
    NormalizedDiscussionPoint,
};
use archivist_common::Result;
use sqlx::SqliteConnection;

pub async fn upsert_agenda_item(
    conn: &mut SqliteConnection,
    item: &NormalizedAgendaItem,
    now: &str,
) -> Result<UpsertOutcome> {
    let existed = row_exists(conn, EntityKind::AgendaItem, item.id).await?;

    sqlx::query(
        r#"
        INSERT INTO agenda_items (id, meeting_id, status, order_index, raw_json, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            meeting_id = excluded.meeting_id,
            status = excluded.status,
            order_index = excluded.order_index,
            raw_json = excluded.raw_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.meeting_id.to_string())
    .bind(&item.status)
    .bind(item.order_index)
    .bind(item.raw_json.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(outcome(existed))
}

pub async fn upsert_action_item(
    conn: &mut SqliteConnection,
    item: &NormalizedActionItem,
    now: &str,
) -> Result<UpsertOutcome> {
    let existed = row_exists(conn, EntityKind::ActionItem, item.id).await?;

    sqlx::query(
        r#"
        INSERT INTO action_items (
            id, agenda_item_id, text, assignee, due_date, status,
            position_index, raw_json, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            agenda_item_id = excluded.agenda_item_id,
            text = excluded.text,
            assignee = excluded.assignee,
            due_date = excluded.due_date,
            status = excluded.status,
            position_index = excluded.position_index,
            raw_json = excluded.raw_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.agenda_item_id.to_string())
    .bind(&item.text)
    .bind(&item.assignee)
    .bind(&item.due_date)
    .bind(&item.status)
    .bind(item.position_index)
    .bind(item.raw_json.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(outcome(existed))
}

pub async fn upsert_decision_item(
    conn: &mut SqliteConnection,
    item: &NormalizedDecisionItem,
    now: &str,
) -> Result<UpsertOutcome> {
    let existed = row_exists(conn, EntityKind::DecisionItem, item.id).await?;

    sqlx::query(
        r#"
        INSERT INTO decision_items (
            id, agenda_item_id, decision, rationale, opposing, effect,
            position_index, raw_json, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            agenda_item_id = excluded.agenda_item_id,
            decision = excluded.decision,
            rationale = excluded.rationale,
            opposing = excluded.opposing,
            effect = excluded.effect,
            position_index = excluded.position_index,
            raw_json = excluded.raw_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.agenda_item_id.to_string())
    .bind(&item.decision)
    .bind(&item.rationale)
    .bind(&item.opposing)
    .bind(&item.effect)
    .bind(item.position_index)
    .bind(item.raw_json.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(outcome(existed))
}

pub async fn upsert_discussion_point(
    conn: &mut SqliteConnection,
    item: &NormalizedDiscussionPoint,
    now: &str,
) -> Result<UpsertOutcome> {
    let existed = row_exists(conn, EntityKind::DiscussionPoint, item.id).await?;

    sqlx::query(
        r#"
        INSERT INTO discussion_points (
            id, agenda_item_id, point, position_index, raw_json, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            agenda_item_id = excluded.agenda_item_id,
            point = excluded.point,
            position_index = excluded.position_index,
            raw_json = excluded.raw_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.agenda_item_id.to_string())
    .bind(&item.point)
    .bind(item.position_index)
    .bind(item.raw_json.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(outcome(existed))
}
