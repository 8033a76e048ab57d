//! Error types for archivist-ingest
//!
//! Each kind is recovered at its own granularity:
//! - [`SourceError`]: skips one source, the run continues
//! - [`RecordError`]: skips one record, the source continues
//! - [`TransactionError`]: rolls back one meeting subtree (or one workgroup), the source continues
//! - [`ConfigurationError`]: fatal, raised before any work starts
//!
//! Only [`IngestError`] reaches the binary's exit code directly.

use crate::models::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error category, as reported in structured logs and mapped to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Structure incompatibility, unparseable payload, or per-record validation failure
    Validation,
    /// Download failed or returned a non-success status
    Network,
    /// Storage failure during a merge
    Database,
    /// Bad connection string or config file
    Configuration,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Validation => "validation",
            ErrorType::Network => "network",
            ErrorType::Database => "database",
            ErrorType::Configuration => "configuration",
        }
    }

    /// Process exit code for a run whose worst error was of this type
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorType::Configuration => 1,
            ErrorType::Validation => 2,
            ErrorType::Network => 3,
            ErrorType::Database => 4,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a whole source was skipped
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SourceErrorKind {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("payload is not valid JSON: {0}")]
    Parse(String),

    #[error("incompatible structure: {}", .0.join("; "))]
    Incompatible(Vec<String>),
}

/// Source-level failure
#[derive(Debug, Clone, Error)]
#[error("source {source_url}: {kind}")]
pub struct SourceError {
    pub source_url: String,
    pub kind: SourceErrorKind,
}

impl SourceError {
    pub fn new(source_url: impl Into<String>, kind: SourceErrorKind) -> Self {
        Self {
            source_url: source_url.into(),
            kind,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self.kind {
            SourceErrorKind::Network(_) | SourceErrorKind::HttpStatus(_) => ErrorType::Network,
            SourceErrorKind::Parse(_) | SourceErrorKind::Incompatible(_) => ErrorType::Validation,
        }
    }
}

/// Per-record validation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("record {record_index}: {field}: {reason}")]
pub struct RecordError {
    pub record_index: usize,
    pub field: String,
    pub reason: String,
}

impl RecordError {
    pub fn new(record_index: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            record_index,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Storage failure that rolled back one unit of work
#[derive(Debug, Clone, Error)]
#[error("{entity_kind} {entity_id} from {source_url}: {message}")]
pub struct TransactionError {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub source_url: String,
    pub message: String,
}

/// Fatal configuration problem
#[derive(Debug, Clone, Error)]
#[error("configuration error: {0}")]
pub struct ConfigurationError(pub String);

impl From<archivist_common::Error> for ConfigurationError {
    fn from(err: archivist_common::Error) -> Self {
        match err {
            archivist_common::Error::Config(msg) => ConfigurationError(msg),
            other => ConfigurationError(other.to_string()),
        }
    }
}

/// Error that ends the process instead of being recorded in a run summary
///
/// Source, record and transaction failures are recovered by the driver and
/// never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Storage failure outside a driver run (run history listing)
    #[error("database error: {0}")]
    Storage(#[from] archivist_common::Error),
}

impl IngestError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            IngestError::Configuration(_) => ErrorType::Configuration,
            IngestError::Storage(_) => ErrorType::Database,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.error_type().exit_code()
    }
}
