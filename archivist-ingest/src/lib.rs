//! # archivist-ingest
//!
//! Multi-source idempotent ingestion of meeting summary archives into SQLite.
//! Re-running a set of sources converges to the same stored state; the order
//! of the sources decides which values win where they overlap.

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;

pub use crate::error::{ErrorType, IngestError};
