//! Relational write-sets produced by the record normalizer

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

/// Workgroup as committed in the pre-merge phase
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedWorkgroup {
    pub id: Uuid,
    pub name: String,
    pub raw_json: Value,
}

/// One meeting and its full entity subtree, ready for a single merge transaction
#[derive(Debug, Clone)]
pub struct NormalizedMeeting {
    pub id: Uuid,
    pub workgroup_id: Uuid,
    pub workgroup_name: String,
    pub date: NaiveDate,
    pub meeting_type: Option<String>,
    pub host: Option<String>,
    pub documenter: Option<String>,
    pub purpose: Option<String>,
    pub attendees: Vec<String>,
    pub video_links: Vec<String>,
    pub working_docs: Value,
    pub timestamped_video: Value,
    pub tags: Value,
    pub raw_json: Value,
    pub agenda_items: Vec<NormalizedAgendaItem>,
    /// Position of the record in its source array
    pub record_index: usize,
}

impl NormalizedMeeting {
    /// Stored form of `date`
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Number of rows this meeting writes, itself included
    pub fn row_count(&self) -> usize {
        1 + self
            .agenda_items
            .iter()
            .map(|item| {
                1 + item.action_items.len() + item.decision_items.len() + item.discussion_points.len()
            })
            .sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedAgendaItem {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub status: Option<String>,
    pub order_index: i64,
    pub raw_json: Value,
    pub action_items: Vec<NormalizedActionItem>,
    pub decision_items: Vec<NormalizedDecisionItem>,
    pub discussion_points: Vec<NormalizedDiscussionPoint>,
}

#[derive(Debug, Clone)]
pub struct NormalizedActionItem {
    pub id: Uuid,
    pub agenda_item_id: Uuid,
    pub text: String,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub position_index: i64,
    pub raw_json: Value,
}

#[derive(Debug, Clone)]
pub struct NormalizedDecisionItem {
    pub id: Uuid,
    pub agenda_item_id: Uuid,
    pub decision: String,
    pub rationale: Option<String>,
    pub opposing: Option<String>,
    pub effect: Option<String>,
    pub position_index: i64,
    pub raw_json: Value,
}

#[derive(Debug, Clone)]
pub struct NormalizedDiscussionPoint {
    pub id: Uuid,
    pub agenda_item_id: Uuid,
    pub point: String,
    pub position_index: i64,
    pub raw_json: Value,
}
