//! Entity kinds stored by the ingestion pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a stored entity, used in identity keys, conflict log entries and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Workgroup,
    Meeting,
    AgendaItem,
    ActionItem,
    DecisionItem,
    DiscussionPoint,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Workgroup => "workgroup",
            EntityKind::Meeting => "meeting",
            EntityKind::AgendaItem => "agenda_item",
            EntityKind::ActionItem => "action_item",
            EntityKind::DecisionItem => "decision_item",
            EntityKind::DiscussionPoint => "discussion_point",
        }
    }

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Workgroup => "workgroups",
            EntityKind::Meeting => "meetings",
            EntityKind::AgendaItem => "agenda_items",
            EntityKind::ActionItem => "action_items",
            EntityKind::DecisionItem => "decision_items",
            EntityKind::DiscussionPoint => "discussion_points",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
