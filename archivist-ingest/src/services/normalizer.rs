//! Record normalization
//!
//! Splits one hierarchical meeting record into its relational write-set:
//! flat columns, array columns, verbatim nested JSON, and the original
//! payload. Per-record validation happens here; a failing record yields a
//! [`RecordError`] naming the offending field and is skipped by the caller.

use crate::error::RecordError;
use crate::models::{
    EntityKind, NormalizedActionItem, NormalizedAgendaItem, NormalizedDecisionItem,
    NormalizedDiscussionPoint, NormalizedMeeting, RawAgendaItem, RawMeetingRecord,
};
use crate::services::identity::{self, IdentityKey};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use uuid::Uuid;

/// Normalize the record at `record_index` of its source array
pub fn normalize(record: &Value, record_index: usize) -> Result<NormalizedMeeting, RecordError> {
    let err = |field: &str, reason: String| RecordError::new(record_index, field, reason);

    if !record.is_object() {
        return Err(err("record", "expected an object".to_string()));
    }

    let raw: RawMeetingRecord =
        serde_json::from_value(record.clone()).map_err(|e| err("record", e.to_string()))?;

    let workgroup_id_str = required_text(raw.workgroup_id.as_deref())
        .ok_or_else(|| err("workgroup_id", "missing or empty".to_string()))?;
    let workgroup_id = identity::parse_id(workgroup_id_str)
        .map_err(|e| err("workgroup_id", e.to_string()))?;

    let workgroup_name = required_text(raw.workgroup.as_deref())
        .ok_or_else(|| err("workgroup", "missing or empty".to_string()))?
        .to_string();

    let info = raw
        .meeting_info
        .as_ref()
        .ok_or_else(|| err("meetingInfo", "missing".to_string()))?;

    let date_str = required_text(info.date.as_deref())
        .ok_or_else(|| err("meetingInfo.date", "missing or empty".to_string()))?;
    let date = parse_date(date_str).ok_or_else(|| {
        err(
            "meetingInfo.date",
            format!("'{}' is not YYYY-MM-DD or RFC 3339", date_str),
        )
    })?;

    let raw_agenda = raw
        .agenda_items
        .as_ref()
        .ok_or_else(|| err("agendaItems", "missing".to_string()))?;

    let host = non_blank(info.host.as_deref());
    let purpose = non_blank(info.purpose.as_deref());
    let date_key = date.format("%Y-%m-%d").to_string();

    let meeting_id = identity::assign(
        raw.id.as_deref(),
        &IdentityKey::Meeting {
            workgroup_id,
            date: &date_key,
            host: host.as_deref().unwrap_or(""),
            purpose: purpose.as_deref().unwrap_or(""),
        },
    )
    .map_err(|e| err("id", e.to_string()))?;

    let attendees = match &info.people_present {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(names)) => split_names(names),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|n| non_blank(Some(n)))
            .collect(),
        Some(_) => {
            return Err(err(
                "meetingInfo.peoplePresent",
                "expected a comma separated string or an array".to_string(),
            ))
        }
    };

    let mut video_links: Vec<String> = Vec::new();
    for link in info.link_fields().into_iter().flatten() {
        let link = link.trim();
        if !link.is_empty() && !video_links.iter().any(|l| l == link) {
            video_links.push(link.to_string());
        }
    }

    let mut agenda_items = Vec::with_capacity(raw_agenda.len());
    for (order_index, item) in raw_agenda.iter().enumerate() {
        let raw_json = record["agendaItems"][order_index].clone();
        agenda_items.push(normalize_agenda_item(
            record_index,
            meeting_id,
            order_index,
            item,
            raw_json,
        )?);
    }

    Ok(NormalizedMeeting {
        id: meeting_id,
        workgroup_id,
        workgroup_name,
        date,
        meeting_type: non_blank(raw.meeting_type.as_deref()),
        host,
        documenter: non_blank(info.documenter.as_deref()),
        purpose,
        attendees,
        video_links,
        working_docs: info.working_docs.clone().unwrap_or(Value::Null),
        timestamped_video: info.timestamped_video.clone().unwrap_or(Value::Null),
        tags: raw.tags.clone().unwrap_or(Value::Null),
        raw_json: record.clone(),
        agenda_items,
        record_index,
    })
}

fn normalize_agenda_item(
    record_index: usize,
    meeting_id: Uuid,
    order_index: usize,
    item: &RawAgendaItem,
    raw_json: Value,
) -> Result<NormalizedAgendaItem, RecordError> {
    let path = format!("agendaItems[{}]", order_index);
    let err = |field: String, reason: String| RecordError::new(record_index, field, reason);

    let id = identity::assign(
        item.id.as_deref(),
        &IdentityKey::Child {
            parent_id: meeting_id,
            kind: EntityKind::AgendaItem,
            position_index: order_index,
        },
    )
    .map_err(|e| err(format!("{}.id", path), e.to_string()))?;

    let mut action_items = Vec::new();
    for (position, action) in item.action_items.iter().flatten().enumerate() {
        let field = format!("{}.actionItems[{}]", path, position);
        let text = required_text(action.text.as_deref())
            .ok_or_else(|| err(format!("{}.text", field), "missing or empty".to_string()))?;
        let action_id = child_id(action.id.as_deref(), id, EntityKind::ActionItem, position)
            .map_err(|e| err(format!("{}.id", field), e.to_string()))?;

        action_items.push(NormalizedActionItem {
            id: action_id,
            agenda_item_id: id,
            text: text.to_string(),
            assignee: non_blank(action.assignee.as_deref()),
            due_date: non_blank(action.due_date.as_deref()),
            status: non_blank(action.status.as_deref()),
            position_index: position as i64,
            raw_json: raw_json["actionItems"][position].clone(),
        });
    }

    let mut decision_items = Vec::new();
    for (position, decision) in item.decision_items.iter().flatten().enumerate() {
        let field = format!("{}.decisionItems[{}]", path, position);
        let text = required_text(decision.decision.as_deref())
            .ok_or_else(|| err(format!("{}.decision", field), "missing or empty".to_string()))?;
        let decision_id = child_id(decision.id.as_deref(), id, EntityKind::DecisionItem, position)
            .map_err(|e| err(format!("{}.id", field), e.to_string()))?;

        decision_items.push(NormalizedDecisionItem {
            id: decision_id,
            agenda_item_id: id,
            decision: text.to_string(),
            rationale: non_blank(decision.rationale.as_deref()),
            opposing: non_blank(decision.opposing.as_deref()),
            effect: non_blank(decision.effect.as_deref()),
            position_index: position as i64,
            raw_json: raw_json["decisionItems"][position].clone(),
        });
    }

    let mut discussion_points = Vec::new();
    for (position, point) in item.discussion_points.iter().flatten().enumerate() {
        let field = format!("{}.discussionPoints[{}]", path, position);
        let text = required_text(point.text())
            .ok_or_else(|| err(field.clone(), "missing or empty".to_string()))?;
        let point_id = child_id(point.id(), id, EntityKind::DiscussionPoint, position)
            .map_err(|e| err(format!("{}.id", field), e.to_string()))?;

        discussion_points.push(NormalizedDiscussionPoint {
            id: point_id,
            agenda_item_id: id,
            point: text.to_string(),
            position_index: position as i64,
            raw_json: raw_json["discussionPoints"][position].clone(),
        });
    }

    Ok(NormalizedAgendaItem {
        id,
        meeting_id,
        status: non_blank(item.status.as_deref()),
        order_index: order_index as i64,
        raw_json,
        action_items,
        decision_items,
        discussion_points,
    })
}

fn child_id(
    supplied: Option<&str>,
    parent_id: Uuid,
    kind: EntityKind,
    position_index: usize,
) -> Result<Uuid, identity::InvalidIdError> {
    identity::assign(
        supplied,
        &IdentityKey::Child {
            parent_id,
            kind,
            position_index,
        },
    )
}

/// `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .filter_map(|n| non_blank(Some(n)))
        .collect()
}

fn required_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    required_text(value).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WG: &str = "11111111-1111-1111-1111-111111111111";

    fn record() -> Value {
        json!({
            "workgroup": "Archives WG",
            "workgroup_id": WG,
            "type": "Custom",
            "meetingInfo": {
                "date": "2024-01-01",
                "host": "Alice",
                "documenter": "Bob",
                "purpose": "Weekly sync",
                "peoplePresent": "Alice, Bob,  Carol ,",
                "meetingVideoLink": "https://video/1",
                "mediaLink": "https://video/1",
                "transcriptLink": "https://transcript/1",
                "workingDocs": [{"title": "Notes", "link": "https://doc"}],
                "timestampedVideo": {"url": "https://video/1", "timestamps": "00:00 intro"}
            },
            "agendaItems": [{
                "status": "carry over",
                "actionItems": [{"text": "Write report", "assignee": "Bob", "status": "todo"}],
                "decisionItems": [{"decision": "Adopt plan", "effect": "affectsOnlyThisWorkgroup"}],
                "discussionPoints": ["Budget", {"point": "Timeline"}]
            }],
            "tags": {"topicsCovered": "archives"}
        })
    }

    #[test]
    fn test_normalize_full_record() {
        let meeting = normalize(&record(), 0).unwrap();

        assert_eq!(meeting.workgroup_id.to_string(), WG);
        assert_eq!(meeting.date_string(), "2024-01-01");
        assert_eq!(meeting.attendees, vec!["Alice", "Bob", "Carol"]);
        assert_eq!(
            meeting.video_links,
            vec!["https://video/1", "https://transcript/1"]
        );
        assert_eq!(meeting.working_docs[0]["title"], "Notes");
        assert_eq!(meeting.tags["topicsCovered"], "archives");
        assert_eq!(meeting.raw_json, record());

        let agenda = &meeting.agenda_items[0];
        assert_eq!(agenda.meeting_id, meeting.id);
        assert_eq!(agenda.action_items[0].text, "Write report");
        assert_eq!(agenda.decision_items[0].decision, "Adopt plan");
        assert_eq!(agenda.discussion_points[1].point, "Timeline");
        assert_eq!(agenda.discussion_points[1].raw_json, json!({"point": "Timeline"}));
        assert_eq!(meeting.row_count(), 6);
    }

    #[test]
    fn test_ids_stable_across_calls() {
        let first = normalize(&record(), 0).unwrap();
        let second = normalize(&record(), 7).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.agenda_items[0].id, second.agenda_items[0].id);
        assert_eq!(
            first.agenda_items[0].action_items[0].id,
            second.agenda_items[0].action_items[0].id
        );
    }

    #[test]
    fn test_supplied_meeting_id_used() {
        let mut rec = record();
        rec["id"] = json!("33333333-3333-3333-3333-333333333333");
        let meeting = normalize(&rec, 0).unwrap();
        assert_eq!(meeting.id.to_string(), "33333333-3333-3333-3333-333333333333");

        rec["id"] = json!("meeting-42");
        let err = normalize(&rec, 2).unwrap_err();
        assert_eq!(err.field, "id");
        assert_eq!(err.record_index, 2);
    }

    #[test]
    fn test_invalid_workgroup_id() {
        let mut rec = record();
        rec["workgroup_id"] = json!("W-1");
        assert_eq!(normalize(&rec, 0).unwrap_err().field, "workgroup_id");
    }

    #[test]
    fn test_unparseable_date() {
        let mut rec = record();
        rec["meetingInfo"]["date"] = json!("01/02/2024");
        assert_eq!(normalize(&rec, 0).unwrap_err().field, "meetingInfo.date");
    }

    #[test]
    fn test_rfc3339_date_accepted() {
        let mut rec = record();
        rec["meetingInfo"]["date"] = json!("2024-03-05T10:00:00Z");
        assert_eq!(normalize(&rec, 0).unwrap().date_string(), "2024-03-05");
    }

    #[test]
    fn test_blank_action_text_rejected_with_path() {
        let mut rec = record();
        rec["agendaItems"][0]["actionItems"][0]["text"] = json!("   ");
        let err = normalize(&rec, 4).unwrap_err();
        assert_eq!(err.field, "agendaItems[0].actionItems[0].text");
    }

    #[test]
    fn test_blank_decision_rejected() {
        let mut rec = record();
        rec["agendaItems"][0]["decisionItems"][0]["decision"] = json!("");
        let err = normalize(&rec, 0).unwrap_err();
        assert_eq!(err.field, "agendaItems[0].decisionItems[0].decision");
    }

    #[test]
    fn test_people_present_array() {
        let mut rec = record();
        rec["meetingInfo"]["peoplePresent"] = json!(["Dana", " ", "Eve"]);
        assert_eq!(normalize(&rec, 0).unwrap().attendees, vec!["Dana", "Eve"]);
    }

    #[test]
    fn test_empty_agenda_items() {
        let mut rec = record();
        rec["agendaItems"] = json!([]);
        let meeting = normalize(&rec, 0).unwrap();
        assert!(meeting.agenda_items.is_empty());
        assert_eq!(meeting.row_count(), 1);
    }
}
