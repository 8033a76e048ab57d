//! Run results: counters, per-source reports, error and conflict logs

use crate::error::{ErrorType, RecordError, SourceError, TransactionError};
use crate::models::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One recovered error, as logged and reported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub source_url: String,
    pub error_type: ErrorType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
}

impl ErrorEntry {
    pub fn from_source(err: &SourceError) -> Self {
        Self {
            timestamp: Utc::now(),
            source_url: err.source_url.clone(),
            error_type: err.error_type(),
            message: err.kind.to_string(),
            entity_id: None,
            record_index: None,
        }
    }

    pub fn from_record(source_url: &str, err: &RecordError) -> Self {
        Self {
            timestamp: Utc::now(),
            source_url: source_url.to_string(),
            error_type: ErrorType::Validation,
            message: format!("{}: {}", err.field, err.reason),
            entity_id: None,
            record_index: Some(err.record_index),
        }
    }

    pub fn from_transaction(err: &TransactionError, record_index: Option<usize>) -> Self {
        Self {
            timestamp: Utc::now(),
            source_url: err.source_url.clone(),
            error_type: ErrorType::Database,
            message: format!("{}: {}", err.entity_kind, err.message),
            entity_id: Some(err.entity_id.clone()),
            record_index,
        }
    }
}

/// UPSERT that hit an existing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub source_url: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Passed structure validation; its records were merged (or dry-run normalized)
    Processed,
    /// Download, parse or structure validation failed; nothing written
    Skipped,
}

/// Per-source counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub ordinal: usize,
    pub source_url: String,
    pub status: SourceStatus,
    pub records_seen: usize,
    pub records_inserted: usize,
    pub records_updated: usize,
    pub records_skipped: usize,
    pub records_failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
}

impl SourceReport {
    pub fn new(ordinal: usize, source_url: impl Into<String>) -> Self {
        Self {
            ordinal,
            source_url: source_url.into(),
            status: SourceStatus::Processed,
            records_seen: 0,
            records_inserted: 0,
            records_updated: 0,
            records_skipped: 0,
            records_failed: 0,
            problems: Vec::new(),
        }
    }
}

/// Aggregate outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// No errors at any granularity
    Success,
    /// Some sources, records or transactions failed; the rest committed
    PartialSuccess,
    /// No source could be processed
    Failure,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::PartialSuccess => "partial_success",
            RunOutcome::Failure => "failure",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one driver run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,

    pub sources_total: usize,
    pub sources_processed: usize,
    pub sources_failed: usize,

    /// Distinct workgroups across all compatible sources
    pub workgroups_seen: usize,
    pub workgroups_committed: usize,
    pub workgroups_failed: usize,

    pub records_seen: usize,
    /// Meetings that did not exist before this run touched them
    pub records_inserted: usize,
    /// Meetings overwritten in place
    pub records_updated: usize,
    /// Records rejected by per-record validation
    pub records_skipped: usize,
    /// Records whose merge transaction rolled back
    pub records_failed: usize,
    /// Records that normalized cleanly (all of them in a dry run)
    pub records_validated: usize,

    pub sources: Vec<SourceReport>,
    pub conflicts: Vec<ConflictEntry>,
    pub errors: Vec<ErrorEntry>,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            dry_run,
            started_at: Utc::now(),
            ended_at: None,
            sources_total: 0,
            sources_processed: 0,
            sources_failed: 0,
            workgroups_seen: 0,
            workgroups_committed: 0,
            workgroups_failed: 0,
            records_seen: 0,
            records_inserted: 0,
            records_updated: 0,
            records_skipped: 0,
            records_failed: 0,
            records_validated: 0,
            sources: Vec::new(),
            conflicts: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.sources_total > 0 && self.sources_processed == 0 {
            RunOutcome::Failure
        } else if self.errors.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::PartialSuccess
        }
    }

    /// Most severe error type recorded (database > network > validation)
    pub fn worst_error_type(&self) -> Option<ErrorType> {
        self.errors.iter().map(|e| e.error_type).max()
    }

    pub fn exit_code(&self) -> u8 {
        self.worst_error_type().map(|t| t.exit_code()).unwrap_or(0)
    }

    pub fn count_errors(&self, error_type: ErrorType) -> usize {
        self.errors.iter().filter(|e| e.error_type == error_type).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {}{}: {}",
            self.run_id,
            if self.dry_run { " (dry run)" } else { "" },
            self.outcome()
        )?;
        writeln!(
            f,
            "  sources:    {} total, {} processed, {} failed",
            self.sources_total, self.sources_processed, self.sources_failed
        )?;
        writeln!(
            f,
            "  workgroups: {} seen, {} committed, {} failed",
            self.workgroups_seen, self.workgroups_committed, self.workgroups_failed
        )?;
        writeln!(
            f,
            "  records:    {} seen, {} inserted, {} updated, {} skipped, {} failed, {} validated",
            self.records_seen,
            self.records_inserted,
            self.records_updated,
            self.records_skipped,
            self.records_failed,
            self.records_validated
        )?;
        writeln!(f, "  conflicts:  {}", self.conflicts.len())?;

        for source in &self.sources {
            let status = match source.status {
                SourceStatus::Processed => "processed",
                SourceStatus::Skipped => "skipped",
            };
            writeln!(f, "  [{}] {} {}", source.ordinal, status, source.source_url)?;
            for problem in &source.problems {
                writeln!(f, "      - {}", problem)?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f, "  errors:")?;
            for err in &self.errors {
                write!(f, "    {} {} {}", err.error_type, err.source_url, err.message)?;
                if let Some(index) = err.record_index {
                    write!(f, " (record {})", index)?;
                }
                if let Some(id) = &err.entity_id {
                    write!(f, " [{}]", id)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorKind;

    #[test]
    fn test_clean_run_is_success() {
        let mut summary = RunSummary::new(false);
        summary.sources_total = 2;
        summary.sources_processed = 2;

        assert_eq!(summary.outcome(), RunOutcome::Success);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_partial_success_and_precedence() {
        let mut summary = RunSummary::new(false);
        summary.sources_total = 3;
        summary.sources_processed = 2;
        summary.sources_failed = 1;

        summary.errors.push(ErrorEntry::from_record(
            "a",
            &RecordError::new(0, "meetingInfo.date", "missing"),
        ));
        assert_eq!(summary.outcome(), RunOutcome::PartialSuccess);
        assert_eq!(summary.exit_code(), 2);

        summary.errors.push(ErrorEntry::from_source(&SourceError::new(
            "b",
            SourceErrorKind::HttpStatus(503),
        )));
        assert_eq!(summary.exit_code(), 3);

        summary.errors.push(ErrorEntry::from_transaction(
            &TransactionError {
                entity_kind: EntityKind::Meeting,
                entity_id: "m".into(),
                source_url: "c".into(),
                message: "constraint failed".into(),
            },
            Some(4),
        ));
        assert_eq!(summary.exit_code(), 4);
        assert_eq!(summary.count_errors(ErrorType::Validation), 1);
    }

    #[test]
    fn test_all_sources_failed_is_failure() {
        let mut summary = RunSummary::new(false);
        summary.sources_total = 1;
        summary.sources_failed = 1;
        summary.errors.push(ErrorEntry::from_source(&SourceError::new(
            "a",
            SourceErrorKind::Network("connection refused".into()),
        )));

        assert_eq!(summary.outcome(), RunOutcome::Failure);
        assert!(summary.to_string().contains("failure"));
    }
}
