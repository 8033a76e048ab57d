//! Auditor tests against an on-disk database seeded with duplicate meetings

use archivist_reconcile::{Auditor, NaturalKey, ReconcileError};
use sqlx::SqlitePool;
use tempfile::TempDir;

const WG: &str = "11111111-1111-1111-1111-111111111111";

async fn create_test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("archive.db").display());
    let pool = archivist_common::db::init_database(&url).await.unwrap();

    sqlx::query(
        "INSERT INTO workgroups (id, name, raw_json, created_at, updated_at) VALUES (?, 'W', '{}', 't', 't')",
    )
    .bind(WG)
    .execute(&pool)
    .await
    .unwrap();

    (dir, pool)
}

async fn insert_meeting(pool: &SqlitePool, id: &str, purpose: &str, created_at: &str) {
    sqlx::query(
        r#"
        INSERT INTO meetings (id, workgroup_id, date, host, purpose, raw_json, created_at, updated_at)
        VALUES (?, ?, '2024-01-01', 'Alice', ?, '{}', ?, ?)
        "#,
    )
    .bind(id)
    .bind(WG)
    .bind(purpose)
    .bind(created_at)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_agenda_item(pool: &SqlitePool, id: &str, meeting_id: &str, order_index: i64) {
    sqlx::query(
        r#"
        INSERT INTO agenda_items (id, meeting_id, order_index, raw_json, created_at, updated_at)
        VALUES (?, ?, ?, '{}', 't', 't')
        "#,
    )
    .bind(id)
    .bind(meeting_id)
    .bind(order_index)
    .execute(pool)
    .await
    .unwrap();
}

async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

async fn seed_duplicates(pool: &SqlitePool) {
    insert_meeting(pool, "m-newer", "Sync", "2024-02-01T00:00:00.000000Z").await;
    insert_meeting(pool, "m-oldest", "Sync", "2024-01-01T00:00:00.000000Z").await;
    insert_meeting(pool, "m-middle", " Sync ", "2024-01-15T00:00:00.000000Z").await;
    insert_agenda_item(pool, "a-newer", "m-newer", 1).await;
    insert_agenda_item(pool, "a-oldest", "m-oldest", 0).await;
    insert_agenda_item(pool, "a-middle", "m-middle", 0).await;
}

#[tokio::test]
async fn test_preview_picks_oldest_survivor_and_writes_nothing() {
    let (_dir, pool) = create_test_db().await;
    seed_duplicates(&pool).await;
    let auditor = Auditor::new(pool.clone(), 1000);

    let plan = auditor.preview(NaturalKey::Meeting).await.unwrap();

    assert_eq!(plan.groups.len(), 1);
    let group = &plan.groups[0];
    assert_eq!(group.survivor().id, "m-oldest");
    let losers: Vec<&str> = group.losers().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(losers, vec!["m-middle", "m-newer"]);

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM meetings").await, 3);
}

#[tokio::test]
async fn test_apply_reassigns_children_and_deletes_losers() {
    let (_dir, pool) = create_test_db().await;
    seed_duplicates(&pool).await;
    let auditor = Auditor::new(pool.clone(), 1000);

    let plan = auditor.preview(NaturalKey::Meeting).await.unwrap();
    let report = auditor.apply(NaturalKey::Meeting, &plan.digest()).await.unwrap();

    assert_eq!(report.meetings_deleted(), 2);
    assert_eq!(report.children_reassigned(), 1);
    assert_eq!(report.children_dropped(), 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM meetings").await, 1);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM agenda_items WHERE meeting_id = 'm-oldest'").await,
        2
    );
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM agenda_items WHERE id = 'a-newer'").await, 1);

    let again = auditor.preview(NaturalKey::Meeting).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_stale_digest_refused() {
    let (_dir, pool) = create_test_db().await;
    seed_duplicates(&pool).await;
    let auditor = Auditor::new(pool.clone(), 1000);

    let plan = auditor.preview(NaturalKey::Meeting).await.unwrap();
    insert_meeting(&pool, "m-late", "Sync", "2024-03-01T00:00:00.000000Z").await;

    let result = auditor.apply(NaturalKey::Meeting, &plan.digest()).await;
    assert!(matches!(result, Err(ReconcileError::DigestMismatch { .. })));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM meetings").await, 4);
}

#[tokio::test]
async fn test_created_at_tie_broken_by_id() {
    let (_dir, pool) = create_test_db().await;
    insert_meeting(&pool, "m-b", "Sync", "2024-01-01T00:00:00.000000Z").await;
    insert_meeting(&pool, "m-a", "Sync", "2024-01-01T00:00:00.000000Z").await;
    let auditor = Auditor::new(pool.clone(), 1000);

    let plan = auditor.preview(NaturalKey::Meeting).await.unwrap();
    assert_eq!(plan.groups[0].survivor().id, "m-a");
}

#[tokio::test]
async fn test_date_host_key_ignores_purpose() {
    let (_dir, pool) = create_test_db().await;
    insert_meeting(&pool, "m-1", "Sync", "2024-01-01T00:00:00.000000Z").await;
    insert_meeting(&pool, "m-2", "Weekly sync (edited)", "2024-01-02T00:00:00.000000Z").await;
    let auditor = Auditor::new(pool.clone(), 1000);

    assert!(auditor.preview(NaturalKey::Meeting).await.unwrap().is_empty());

    let plan = auditor.preview(NaturalKey::MeetingDateHost).await.unwrap();
    assert_eq!(plan.groups.len(), 1);
    assert_eq!(plan.deletions(), 1);
}

#[tokio::test]
async fn test_apply_never_doubles_a_survivor_position() {
    let (_dir, pool) = create_test_db().await;
    insert_meeting(&pool, "m-old", "Sync", "2024-01-01T00:00:00.000000Z").await;
    insert_meeting(&pool, "m-new", "Sync", "2024-01-02T00:00:00.000000Z").await;
    insert_agenda_item(&pool, "a-old", "m-old", 0).await;
    insert_agenda_item(&pool, "a-new", "m-new", 0).await;
    sqlx::query(
        r#"
        INSERT INTO action_items (id, agenda_item_id, text, position_index, raw_json, created_at, updated_at)
        VALUES ('x-new', 'a-new', 'Follow up', 0, '{}', 't', 't')
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    let auditor = Auditor::new(pool.clone(), 1000);

    let plan = auditor.preview(NaturalKey::Meeting).await.unwrap();
    let report = auditor.apply(NaturalKey::Meeting, &plan.digest()).await.unwrap();

    assert_eq!(report.children_reassigned(), 0);
    assert_eq!(report.children_dropped(), 1);
    assert_eq!(
        count(
            &pool,
            "SELECT COUNT(*) FROM agenda_items WHERE meeting_id = 'm-old' AND order_index = 0"
        )
        .await,
        1
    );
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM agenda_items").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM action_items").await, 0);
}
