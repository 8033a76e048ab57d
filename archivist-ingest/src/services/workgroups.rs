//! Workgroup preprocessing
//!
//! Workgroups from every compatible source are folded into one accumulator,
//! then committed once each before any meeting is merged, so a meeting never
//! observes a missing parent. Folding follows the driver's source order: the
//! last source to mention a workgroup decides its name.

use crate::db::workgroups::upsert_workgroup;
use crate::error::TransactionError;
use crate::models::{ConflictEntry, EntityKind, NormalizedWorkgroup};
use archivist_common::db::{begin_monitored, retry_on_lock};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Distinct workgroups seen in one run, in first-seen order
#[derive(Debug, Default)]
pub struct WorkgroupAccumulator {
    order: Vec<Uuid>,
    entries: HashMap<Uuid, AccumulatedWorkgroup>,
}

#[derive(Debug, Clone)]
struct AccumulatedWorkgroup {
    workgroup: NormalizedWorkgroup,
    source_url: String,
}

/// Result of the workgroup phase
#[derive(Debug, Default)]
pub struct WorkgroupCommit {
    pub committed: HashSet<Uuid>,
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<TransactionError>,
    /// Workgroups that already existed, with the source that overwrote them
    pub conflicts: Vec<ConflictEntry>,
}

impl WorkgroupAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the workgroups of one source's records
    ///
    /// Records with a missing or malformed workgroup id are ignored here; the
    /// normalizer rejects them later with a proper record error.
    pub fn fold(&mut self, source_url: &str, records: &[Value]) {
        for record in records {
            if let Some(workgroup) = extract_workgroup(record) {
                let id = workgroup.id;
                if let Some(previous) = self.entries.get(&id) {
                    if previous.workgroup.name != workgroup.name {
                        debug!(
                            workgroup_id = %id,
                            previous = %previous.workgroup.name,
                            name = %workgroup.name,
                            source_url = source_url,
                            "Workgroup renamed by later occurrence"
                        );
                    }
                } else {
                    self.order.push(id);
                }
                self.entries.insert(
                    id,
                    AccumulatedWorkgroup {
                        workgroup,
                        source_url: source_url.to_string(),
                    },
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in first-seen order
    pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.order.iter().copied()
    }

    /// Upsert every accumulated workgroup exactly once, each in its own transaction
    ///
    /// A failed workgroup is reported and the rest still commit; meetings of
    /// a failed workgroup are skipped by the driver.
    pub async fn commit(self, pool: &SqlitePool, max_lock_wait_ms: u64) -> WorkgroupCommit {
        let mut result = WorkgroupCommit::default();
        let Self { order, mut entries } = self;

        for id in order {
            let Some(entry) = entries.remove(&id) else {
                continue;
            };

            let outcome = retry_on_lock("commit_workgroup", max_lock_wait_ms, || async {
                let now = archivist_common::time::now_string();
                let mut tx = begin_monitored(pool, "workgroups::commit").await?;
                let outcome = upsert_workgroup(tx.conn(), &entry.workgroup, &now).await?;
                tx.commit().await?;
                Ok::<_, archivist_common::Error>(outcome)
            })
            .await;

            match outcome {
                Ok(outcome) => {
                    if outcome.existed() {
                        result.updated += 1;
                        let conflict = ConflictEntry {
                            entity_id: id.to_string(),
                            entity_kind: EntityKind::Workgroup,
                            source_url: entry.source_url.clone(),
                            timestamp: chrono::Utc::now(),
                        };
                        info!(
                            entity_id = %conflict.entity_id,
                            entity_kind = %conflict.entity_kind,
                            source_url = %conflict.source_url,
                            timestamp = %conflict.timestamp,
                            "UPSERT overwrote existing row"
                        );
                        result.conflicts.push(conflict);
                    } else {
                        result.inserted += 1;
                    }
                    result.committed.insert(id);
                }
                Err(e) => {
                    warn!(
                        workgroup_id = %id,
                        source_url = %entry.source_url,
                        error_type = "database",
                        error = %e,
                        "Workgroup commit failed"
                    );
                    result.failures.push(TransactionError {
                        entity_kind: EntityKind::Workgroup,
                        entity_id: id.to_string(),
                        source_url: entry.source_url,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            committed = result.committed.len(),
            inserted = result.inserted,
            updated = result.updated,
            failed = result.failures.len(),
            "Workgroup phase complete"
        );

        result
    }
}

/// Workgroup carried by one raw record, if its id is well formed
pub fn extract_workgroup(record: &Value) -> Option<NormalizedWorkgroup> {
    let id_str = record.get("workgroup_id")?.as_str()?.trim();
    let id = Uuid::parse_str(id_str).ok()?;
    let name = record
        .get("workgroup")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?;

    Some(NormalizedWorkgroup {
        id,
        name: name.to_string(),
        raw_json: json!({
            "workgroup": record.get("workgroup").cloned().unwrap_or(Value::Null),
            "workgroup_id": record.get("workgroup_id").cloned().unwrap_or(Value::Null),
        }),
    })
}
