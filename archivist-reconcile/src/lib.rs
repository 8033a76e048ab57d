//! # archivist-reconcile
//!
//! Offline auditor for committed ingestion state. Finds meetings that share a
//! natural key, previews the merge plan with a digest, and applies it only
//! when the digest the operator reviewed still matches.

pub mod auditor;
pub mod db;
pub mod natural_key;
pub mod plan;

pub use auditor::{ApplyReport, Auditor, GroupMergeReport, ReconcileError};
pub use db::{DuplicateGroup, MeetingRef};
pub use natural_key::NaturalKey;
pub use plan::ReconciliationPlan;
