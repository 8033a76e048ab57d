//! Data models for archivist-ingest

pub mod entity;
pub mod normalized;
pub mod raw;
pub mod run_summary;
pub mod source;

pub use entity::EntityKind;
pub use normalized::{
    NormalizedActionItem, NormalizedAgendaItem, NormalizedDecisionItem, NormalizedDiscussionPoint,
    NormalizedMeeting, NormalizedWorkgroup,
};
pub use raw::{
    RawActionItem, RawAgendaItem, RawDecisionItem, RawDiscussionPoint, RawMeetingInfo,
    RawMeetingRecord,
};
pub use run_summary::{
    ConflictEntry, ErrorEntry, RunOutcome, RunSummary, SourceReport, SourceStatus,
};
pub use source::Source;
