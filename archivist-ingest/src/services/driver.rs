//! Multi-source driver
//!
//! Runs an ordered list of sources through the pipeline in three phases:
//!
//! 1. **Validation**: each source is downloaded, parsed and checked against
//!    the required structure. A source that fails any step is skipped with a
//!    source error and nothing from it is written. Workgroups of compatible
//!    sources are folded into one accumulator.
//! 2. **Workgroup phase**: every accumulated workgroup is committed once.
//! 3. **Meeting phase**: sources are revisited in order; each record is
//!    normalized and merged in its own transaction.
//!
//! Source order is the processing order and, with last-write-wins merges,
//! decides the final state when sources overlap. One bad source, record or
//! transaction never aborts the run.

use crate::db::runs;
use crate::error::{ErrorType, SourceError, SourceErrorKind};
use crate::models::{
    ErrorEntry, RunSummary, Source, SourceReport, SourceStatus,
};
use crate::services::downloader::Fetcher;
use crate::services::merge::MergeOrchestrator;
use crate::services::normalizer::normalize;
use crate::services::structure_validator::{parse_payload, validate, SampleStrategy};
use crate::services::workgroups::WorkgroupAccumulator;
use archivist_common::config::DEFAULT_MAX_LOCK_WAIT_MS;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Driver tuning
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub sample_strategy: SampleStrategy,
    pub max_lock_wait_ms: u64,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            sample_strategy: SampleStrategy::FirstRecord,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }
}

/// Driver state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Validating { source_url: String },
    Skipped { source_url: String, reason: String },
    WorkgroupPhase,
    MeetingPhase { source_url: String },
    Done,
}

/// Source that passed validation, with its parsed records
struct AcceptedSource<'a> {
    source: &'a Source,
    records: Vec<Value>,
    report_index: usize,
}

pub struct MultiSourceDriver {
    /// `None` in a dry run: nothing is written, not even run history
    pool: Option<SqlitePool>,
    fetcher: Arc<dyn Fetcher>,
    options: DriverOptions,
    state: DriverState,
}

impl MultiSourceDriver {
    pub fn new(pool: SqlitePool, fetcher: Arc<dyn Fetcher>, options: DriverOptions) -> Self {
        Self {
            pool: Some(pool),
            fetcher,
            options,
            state: DriverState::Idle,
        }
    }

    /// Driver that downloads, validates and normalizes without any write
    pub fn dry_run(fetcher: Arc<dyn Fetcher>, options: DriverOptions) -> Self {
        Self {
            pool: None,
            fetcher,
            options,
            state: DriverState::Idle,
        }
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = ?self.state, to = ?next, "Driver state transition");
        self.state = next;
    }

    /// Process `sources` in order
    pub async fn run(&mut self, sources: &[Source]) -> RunSummary {
        let mut summary = RunSummary::new(self.pool.is_none());
        summary.sources_total = sources.len();

        info!(
            run_id = %summary.run_id,
            sources = sources.len(),
            dry_run = summary.dry_run,
            "Run started"
        );

        if let Some(pool) = &self.pool {
            if let Err(e) = runs::insert_run(pool, &summary, sources, self.options.max_lock_wait_ms).await {
                warn!(run_id = %summary.run_id, error = %e, "Failed to record run start");
            }
        }

        // Phase 1: download and validate every source, fold workgroups
        let mut accumulator = WorkgroupAccumulator::new();
        let mut accepted = Vec::new();

        for source in sources {
            self.transition(DriverState::Validating {
                source_url: source.url.clone(),
            });
            let mut report = SourceReport::new(source.ordinal, &source.url);

            match self.load_source(source).await {
                Ok(records) => {
                    info!(
                        source_url = %source.url,
                        records = records.len(),
                        "Source passed structure validation"
                    );
                    accumulator.fold(&source.url, &records);
                    report.records_seen = records.len();
                    accepted.push(AcceptedSource {
                        source,
                        records,
                        report_index: summary.sources.len(),
                    });
                }
                Err(err) => {
                    report.status = SourceStatus::Skipped;
                    report.problems = match &err.kind {
                        SourceErrorKind::Incompatible(problems) => problems.clone(),
                        other => vec![other.to_string()],
                    };
                    summary.sources_failed += 1;
                    record_error(&mut summary, ErrorEntry::from_source(&err));
                    self.transition(DriverState::Skipped {
                        source_url: source.url.clone(),
                        reason: err.kind.to_string(),
                    });
                }
            }

            summary.sources.push(report);
        }

        summary.workgroups_seen = accumulator.len();

        // Phase 2: commit workgroups once, before any meeting
        let committed: HashSet<Uuid> = match self.pool.clone() {
            Some(pool) => {
                self.transition(DriverState::WorkgroupPhase);
                let result = accumulator.commit(&pool, self.options.max_lock_wait_ms).await;

                summary.workgroups_committed = result.committed.len();
                summary.workgroups_failed = result.failures.len();
                for failure in &result.failures {
                    record_error(&mut summary, ErrorEntry::from_transaction(failure, None));
                }
                summary.conflicts.extend(result.conflicts);
                result.committed
            }
            None => accumulator.ids().collect(),
        };

        // Phase 3: merge meetings, one transaction each
        let merger = self
            .pool
            .clone()
            .map(|pool| MergeOrchestrator::new(pool, self.options.max_lock_wait_ms));

        for accepted_source in accepted {
            let url = accepted_source.source.url.clone();
            self.transition(DriverState::MeetingPhase {
                source_url: url.clone(),
            });

            let mut report = summary.sources[accepted_source.report_index].clone();
            for (index, record) in accepted_source.records.iter().enumerate() {
                summary.records_seen += 1;

                let meeting = match normalize(record, index) {
                    Ok(meeting) => meeting,
                    Err(e) => {
                        summary.records_skipped += 1;
                        report.records_skipped += 1;
                        record_error(&mut summary, ErrorEntry::from_record(&url, &e));
                        continue;
                    }
                };

                if !committed.contains(&meeting.workgroup_id) {
                    summary.records_failed += 1;
                    report.records_failed += 1;
                    record_error(
                        &mut summary,
                        ErrorEntry {
                            timestamp: chrono::Utc::now(),
                            source_url: url.clone(),
                            error_type: ErrorType::Database,
                            message: format!(
                                "workgroup {} was not committed in this run",
                                meeting.workgroup_id
                            ),
                            entity_id: Some(meeting.id.to_string()),
                            record_index: Some(index),
                        },
                    );
                    continue;
                }

                let Some(orchestrator) = &merger else {
                    summary.records_validated += 1;
                    continue;
                };

                match orchestrator.merge_meeting(&meeting, &url).await {
                    Ok(outcome) => {
                        summary.records_validated += 1;
                        if outcome.meeting_existed {
                            summary.records_updated += 1;
                            report.records_updated += 1;
                        } else {
                            summary.records_inserted += 1;
                            report.records_inserted += 1;
                        }
                        summary.conflicts.extend(outcome.conflicts);
                    }
                    Err(e) => {
                        summary.records_failed += 1;
                        report.records_failed += 1;
                        record_error(&mut summary, ErrorEntry::from_transaction(&e, Some(index)));
                    }
                }
            }

            info!(
                source_url = %url,
                inserted = report.records_inserted,
                updated = report.records_updated,
                skipped = report.records_skipped,
                failed = report.records_failed,
                "Source processed"
            );
            summary.sources[accepted_source.report_index] = report;
            summary.sources_processed += 1;
        }

        self.transition(DriverState::Done);
        summary.finish();

        if let Some(pool) = &self.pool {
            if let Err(e) = runs::finish_run(pool, &summary, self.options.max_lock_wait_ms).await {
                warn!(run_id = %summary.run_id, error = %e, "Failed to record run result");
            }
        }

        info!(
            run_id = %summary.run_id,
            outcome = %summary.outcome(),
            sources_processed = summary.sources_processed,
            sources_failed = summary.sources_failed,
            records_inserted = summary.records_inserted,
            records_updated = summary.records_updated,
            records_skipped = summary.records_skipped,
            records_failed = summary.records_failed,
            "Run finished"
        );

        summary
    }

    async fn load_source(&self, source: &Source) -> Result<Vec<Value>, SourceError> {
        let fetched = self
            .fetcher
            .fetch(&source.url)
            .await
            .map_err(|e| SourceError::new(&source.url, SourceErrorKind::Network(e.to_string())))?;

        if !fetched.is_success() {
            return Err(SourceError::new(
                &source.url,
                SourceErrorKind::HttpStatus(fetched.status),
            ));
        }

        let records = parse_payload(&fetched.body).map_err(|kind| SourceError::new(&source.url, kind))?;

        let report = validate(&records, self.options.sample_strategy);
        if !report.compatible {
            return Err(SourceError::new(
                &source.url,
                SourceErrorKind::Incompatible(report.problems),
            ));
        }

        debug!(
            source_url = %source.url,
            checked = report.records_checked,
            "Structure validation passed"
        );
        Ok(records)
    }
}

/// Emit the structured event for a recovered error and append it to the log
fn record_error(summary: &mut RunSummary, entry: ErrorEntry) {
    let entity_id = entry.entity_id.as_deref().unwrap_or("");
    let record_index = entry.record_index.map(|i| i as i64).unwrap_or(-1);

    if entry.error_type == ErrorType::Database {
        error!(
            timestamp = %entry.timestamp,
            source_url = %entry.source_url,
            error_type = %entry.error_type,
            entity_id = entity_id,
            record_index = record_index,
            "{}",
            entry.message
        );
    } else {
        warn!(
            timestamp = %entry.timestamp,
            source_url = %entry.source_url,
            error_type = %entry.error_type,
            entity_id = entity_id,
            record_index = record_index,
            "{}",
            entry.message
        );
    }

    summary.errors.push(entry);
}
