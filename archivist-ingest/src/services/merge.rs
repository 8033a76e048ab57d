//! Atomic merge of one meeting and its entity subtree
//!
//! One transaction per meeting. Every row is an UPSERT keyed by id with
//! last-write-wins overwrite. Any failure rolls the whole subtree back, so a
//! meeting and its children are either fully written or left exactly as
//! they were.

use crate::db::{agenda, meetings, UpsertOutcome};
use crate::error::TransactionError;
use crate::models::{ConflictEntry, EntityKind, NormalizedMeeting};
use archivist_common::db::{begin_monitored, retry_on_lock};
use archivist_common::Result;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// What one committed merge did
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub meeting_id: Uuid,
    /// The meeting row was already present before this merge
    pub meeting_existed: bool,
    pub rows_written: usize,
    /// One entry per UPSERT that hit an existing row
    pub conflicts: Vec<ConflictEntry>,
}

/// Commits normalized meetings, one transaction each
#[derive(Clone)]
pub struct MergeOrchestrator {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl MergeOrchestrator {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }

    /// Merge one meeting subtree atomically
    ///
    /// Transient lock contention retries the whole transaction; any other
    /// failure is returned as a [`TransactionError`] after rollback.
    pub async fn merge_meeting(
        &self,
        meeting: &NormalizedMeeting,
        source_url: &str,
    ) -> std::result::Result<MergeOutcome, TransactionError> {
        let result = retry_on_lock("merge_meeting", self.max_lock_wait_ms, || {
            self.merge_attempt(meeting, source_url)
        })
        .await;

        match result {
            Ok(outcome) => {
                for conflict in &outcome.conflicts {
                    info!(
                        entity_id = %conflict.entity_id,
                        entity_kind = %conflict.entity_kind,
                        source_url = %conflict.source_url,
                        timestamp = %conflict.timestamp,
                        "UPSERT overwrote existing row"
                    );
                }
                debug!(
                    meeting_id = %outcome.meeting_id,
                    rows = outcome.rows_written,
                    existed = outcome.meeting_existed,
                    "Meeting merged"
                );
                Ok(outcome)
            }
            Err(e) => Err(TransactionError {
                entity_kind: EntityKind::Meeting,
                entity_id: meeting.id.to_string(),
                source_url: source_url.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn merge_attempt(&self, meeting: &NormalizedMeeting, source_url: &str) -> Result<MergeOutcome> {
        let now = archivist_common::time::now_string();
        let mut conflicts = ConflictLog::new(source_url);

        let mut tx = begin_monitored(&self.pool, "merge::meeting").await?;
        let rows_written = write_subtree(tx.conn(), meeting, &now, &mut conflicts).await?;
        tx.commit().await?;

        let meeting_existed = conflicts
            .entries
            .first()
            .map(|c| c.entity_kind == EntityKind::Meeting)
            .unwrap_or(false);

        Ok(MergeOutcome {
            meeting_id: meeting.id,
            meeting_existed,
            rows_written,
            conflicts: conflicts.entries,
        })
    }
}

/// Conflicts of one attempt; discarded with the attempt on rollback
struct ConflictLog<'a> {
    source_url: &'a str,
    entries: Vec<ConflictEntry>,
}

impl<'a> ConflictLog<'a> {
    fn new(source_url: &'a str) -> Self {
        Self {
            source_url,
            entries: Vec::new(),
        }
    }

    fn record(&mut self, outcome: UpsertOutcome, kind: EntityKind, id: Uuid) {
        if outcome.existed() {
            self.entries.push(ConflictEntry {
                entity_id: id.to_string(),
                entity_kind: kind,
                source_url: self.source_url.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

/// Meeting first, then each agenda item followed by its children
async fn write_subtree(
    conn: &mut SqliteConnection,
    meeting: &NormalizedMeeting,
    now: &str,
    conflicts: &mut ConflictLog<'_>,
) -> Result<usize> {
    let mut rows = 0;

    let outcome = meetings::upsert_meeting(conn, meeting, now).await?;
    conflicts.record(outcome, EntityKind::Meeting, meeting.id);
    rows += 1;

    for item in &meeting.agenda_items {
        let outcome = agenda::upsert_agenda_item(conn, item, now).await?;
        conflicts.record(outcome, EntityKind::AgendaItem, item.id);
        rows += 1;

        for action in &item.action_items {
            let outcome = agenda::upsert_action_item(conn, action, now).await?;
            conflicts.record(outcome, EntityKind::ActionItem, action.id);
            rows += 1;
        }

        for decision in &item.decision_items {
            let outcome = agenda::upsert_decision_item(conn, decision, now).await?;
            conflicts.record(outcome, EntityKind::DecisionItem, decision.id);
            rows += 1;
        }

        for point in &item.discussion_points {
            let outcome = agenda::upsert_discussion_point(conn, point, now).await?;
            conflicts.record(outcome, EntityKind::DiscussionPoint, point.id);
            rows += 1;
        }
    }

    Ok(rows)
}
