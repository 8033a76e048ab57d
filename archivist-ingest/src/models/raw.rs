//! Raw meeting summary records as published by the sources
//!
//! Only the fields the pipeline reads are typed. Everything else lands in the
//! `extra` bag of each struct and survives untouched in `raw_json`.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One element of a source's top-level JSON array
#[derive(Debug, Clone, Deserialize)]
pub struct RawMeetingRecord {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub workgroup: Option<String>,

    #[serde(default)]
    pub workgroup_id: Option<String>,

    #[serde(default, rename = "type")]
    pub meeting_type: Option<String>,

    #[serde(default, rename = "meetingInfo")]
    pub meeting_info: Option<RawMeetingInfo>,

    #[serde(default, rename = "agendaItems")]
    pub agenda_items: Option<Vec<RawAgendaItem>>,

    #[serde(default)]
    pub tags: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeetingInfo {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub documenter: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,

    /// Comma separated string in most sources, an array in a few
    #[serde(default)]
    pub people_present: Option<Value>,

    #[serde(default)]
    pub meeting_video_link: Option<String>,
    #[serde(default)]
    pub media_link: Option<String>,
    #[serde(default)]
    pub other_media_link: Option<String>,
    #[serde(default)]
    pub transcript_link: Option<String>,
    #[serde(default)]
    pub miro_board_link: Option<String>,

    #[serde(default)]
    pub working_docs: Option<Value>,
    #[serde(default)]
    pub timestamped_video: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawMeetingInfo {
    /// Link fields in the order they are collected into `video_links`
    pub fn link_fields(&self) -> [Option<&str>; 5] {
        [
            self.meeting_video_link.as_deref(),
            self.media_link.as_deref(),
            self.other_media_link.as_deref(),
            self.transcript_link.as_deref(),
            self.miro_board_link.as_deref(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAgendaItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub action_items: Option<Vec<RawActionItem>>,
    #[serde(default)]
    pub decision_items: Option<Vec<RawDecisionItem>>,
    #[serde(default)]
    pub discussion_points: Option<Vec<RawDiscussionPoint>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActionItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDecisionItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub opposing: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Discussion points are bare strings in older sources, objects in newer ones
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDiscussionPoint {
    Text(String),
    Object(RawDiscussionObject),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDiscussionObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub point: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawDiscussionPoint {
    pub fn id(&self) -> Option<&str> {
        match self {
            RawDiscussionPoint::Text(_) => None,
            RawDiscussionPoint::Object(obj) => obj.id.as_deref(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            RawDiscussionPoint::Text(text) => Some(text),
            RawDiscussionPoint::Object(obj) => obj.point.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_kept_in_extra() {
        let record: RawMeetingRecord = serde_json::from_value(json!({
            "workgroup": "W",
            "workgroup_id": "11111111-1111-1111-1111-111111111111",
            "meetingInfo": {"date": "2024-01-01", "host": "Alice", "venue": "online"},
            "agendaItems": [],
            "tags": {},
            "type": "sync",
            "noSummaryGiven": false
        }))
        .unwrap();

        assert_eq!(record.meeting_type.as_deref(), Some("sync"));
        assert!(record.extra.contains_key("noSummaryGiven"));
        let info = record.meeting_info.unwrap();
        assert_eq!(info.host.as_deref(), Some("Alice"));
        assert!(info.extra.contains_key("venue"));
    }

    #[test]
    fn test_discussion_point_shapes() {
        let points: Vec<RawDiscussionPoint> =
            serde_json::from_value(json!(["plain", {"point": "structured", "by": "Bob"}])).unwrap();

        assert_eq!(points[0].text(), Some("plain"));
        assert_eq!(points[1].text(), Some("structured"));
        assert_eq!(points[1].id(), None);
    }

    #[test]
    fn test_null_optionals_deserialize() {
        let item: RawActionItem =
            serde_json::from_value(json!({"text": "Ship it", "assignee": null, "dueDate": null}))
                .unwrap();
        assert_eq!(item.text.as_deref(), Some("Ship it"));
        assert!(item.assignee.is_none());
    }
}
