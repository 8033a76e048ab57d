//! Reconciliation auditor
//!
//! Heals meetings that are semantically one but stored as several rows. The
//! oldest row of each group survives; agenda items of the others move under
//! it and the others are deleted, one transaction per group.

use crate::db::{self, DuplicateGroup};
use crate::natural_key::NaturalKey;
use crate::plan::ReconciliationPlan;
use archivist_common::db::{begin_monitored, retry_on_lock};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Database(#[from] archivist_common::Error),

    #[error("plan changed since preview: expected digest {expected}, current plan is {actual}")]
    DigestMismatch { expected: String, actual: String },
}

/// What one merged group changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMergeReport {
    pub survivor_id: String,
    pub deleted: Vec<String>,
    pub children_reassigned: u64,
    /// Loser agenda items at positions the survivor already held, removed with the loser
    pub children_dropped: u64,
}

/// What an apply run changed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyReport {
    pub digest: String,
    pub groups: Vec<GroupMergeReport>,
}

impl ApplyReport {
    pub fn meetings_deleted(&self) -> usize {
        self.groups.iter().map(|g| g.deleted.len()).sum()
    }

    pub fn children_reassigned(&self) -> u64 {
        self.groups.iter().map(|g| g.children_reassigned).sum()
    }

    pub fn children_dropped(&self) -> u64 {
        self.groups.iter().map(|g| g.children_dropped).sum()
    }
}

pub struct Auditor {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl Auditor {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }

    /// Duplicate groups under `key`; read-only
    pub async fn preview(&self, key: NaturalKey) -> Result<ReconciliationPlan, ReconcileError> {
        let groups = db::find_duplicate_groups(&self.pool, key).await?;
        let plan = ReconciliationPlan::new(key, groups);

        info!(
            key = %key,
            groups = plan.groups.len(),
            deletions = plan.deletions(),
            digest = %plan.digest(),
            "Reconciliation preview"
        );
        Ok(plan)
    }

    /// Recompute the plan and merge every group, if it still matches `expected_digest`
    pub async fn apply(&self, key: NaturalKey, expected_digest: &str) -> Result<ApplyReport, ReconcileError> {
        let plan = self.preview(key).await?;
        let actual = plan.digest();

        if !actual.eq_ignore_ascii_case(expected_digest.trim()) {
            return Err(ReconcileError::DigestMismatch {
                expected: expected_digest.trim().to_string(),
                actual,
            });
        }

        let mut report = ApplyReport {
            digest: actual,
            groups: Vec::with_capacity(plan.groups.len()),
        };
        for group in &plan.groups {
            report.groups.push(self.merge_group(group).await?);
        }

        info!(
            groups = report.groups.len(),
            deleted = report.meetings_deleted(),
            reassigned = report.children_reassigned(),
            dropped = report.children_dropped(),
            "Reconciliation applied"
        );
        Ok(report)
    }

    /// Reassign children then delete losers, all in one transaction
    pub async fn merge_group(&self, group: &DuplicateGroup) -> Result<GroupMergeReport, ReconcileError> {
        let survivor_id = group.survivor().id.clone();

        let report = retry_on_lock("merge_group", self.max_lock_wait_ms, || async {
            let mut report = GroupMergeReport {
                survivor_id: survivor_id.clone(),
                ..Default::default()
            };

            let mut tx = begin_monitored(&self.pool, "reconcile::merge_group").await?;
            for loser in group.losers() {
                let held = db::count_agenda_items(tx.conn(), &loser.id).await?;
                let moved = db::reassign_children(tx.conn(), &loser.id, &survivor_id).await?;
                report.children_reassigned += moved;
                report.children_dropped += held.saturating_sub(moved);
                if db::delete_meeting(tx.conn(), &loser.id).await? > 0 {
                    report.deleted.push(loser.id.clone());
                }
            }
            tx.commit().await?;

            Ok::<_, archivist_common::Error>(report)
        })
        .await?;

        for deleted in &report.deleted {
            warn!(
                meeting_id = %deleted,
                survivor_id = %report.survivor_id,
                key = %group.key_values.join(" | "),
                "Deleted duplicate meeting"
            );
        }

        Ok(report)
    }
}
