//! Structure validation
//!
//! Pre-flight check of a source's shape, run before any write. Extra fields
//! are accepted and missing optional fields never fail validation.

use crate::error::SourceErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level fields every record must carry
pub const REQUIRED_FIELDS: [&str; 6] = [
    "workgroup",
    "workgroup_id",
    "meetingInfo",
    "agendaItems",
    "tags",
    "type",
];

/// Which records of a source are checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStrategy {
    #[default]
    FirstRecord,
    AllRecords,
}

/// Outcome of validating one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureReport {
    pub compatible: bool,
    pub problems: Vec<String>,
    pub records_checked: usize,
}

/// Parse a downloaded payload into the top-level record array
pub fn parse_payload(bytes: &[u8]) -> Result<Vec<Value>, SourceErrorKind> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| SourceErrorKind::Parse(e.to_string()))?;

    match value {
        Value::Array(records) => Ok(records),
        other => Err(SourceErrorKind::Incompatible(vec![format!(
            "top level is {}, expected an array of records",
            json_type(&other)
        )])),
    }
}

/// Check the sampled records against the required shape
///
/// An empty array is compatible: there is nothing to write.
pub fn validate(records: &[Value], strategy: SampleStrategy) -> StructureReport {
    let sample: &[Value] = match strategy {
        SampleStrategy::FirstRecord => &records[..records.len().min(1)],
        SampleStrategy::AllRecords => records,
    };

    let mut problems = Vec::new();
    for (index, record) in sample.iter().enumerate() {
        check_record(index, record, &mut problems);
    }

    StructureReport {
        compatible: problems.is_empty(),
        problems,
        records_checked: sample.len(),
    }
}

fn check_record(index: usize, record: &Value, problems: &mut Vec<String>) {
    let object = match record.as_object() {
        Some(object) => object,
        None => {
            problems.push(format!("record {}: is {}, expected an object", index, json_type(record)));
            return;
        }
    };

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            problems.push(format!("record {}: missing required field '{}'", index, field));
        }
    }

    match object.get("meetingInfo") {
        Some(Value::Object(info)) => {
            if !info.contains_key("date") {
                problems.push(format!("record {}: missing required field 'meetingInfo.date'", index));
            }
        }
        Some(other) => problems.push(format!(
            "record {}: 'meetingInfo' is {}, expected an object",
            index,
            json_type(other)
        )),
        None => {}
    }

    if let Some(agenda) = object.get("agendaItems") {
        if !agenda.is_array() {
            problems.push(format!(
                "record {}: 'agendaItems' is {}, expected an array",
                index,
                json_type(agenda)
            ));
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_record() -> Value {
        json!({
            "workgroup": "W",
            "workgroup_id": "11111111-1111-1111-1111-111111111111",
            "meetingInfo": {"date": "2024-01-01", "host": "Alice"},
            "agendaItems": [],
            "tags": {},
            "type": "sync"
        })
    }

    #[test]
    fn test_valid_record_with_extra_fields() {
        let mut record = valid_record();
        record["somethingNew"] = json!(true);

        let report = validate(&[record], SampleStrategy::FirstRecord);
        assert!(report.compatible, "{:?}", report.problems);
        assert_eq!(report.records_checked, 1);
    }

    #[test]
    fn test_missing_agenda_items_is_incompatible() {
        let mut record = valid_record();
        record.as_object_mut().unwrap().remove("agendaItems");

        let report = validate(&[record], SampleStrategy::FirstRecord);
        assert!(!report.compatible);
        assert!(report.problems[0].contains("agendaItems"));
    }

    #[test]
    fn test_missing_date_and_wrong_agenda_type() {
        let mut record = valid_record();
        record["meetingInfo"] = json!({"host": "Alice"});
        record["agendaItems"] = json!({});

        let report = validate(&[record], SampleStrategy::FirstRecord);
        assert_eq!(report.problems.len(), 2);
    }

    #[test]
    fn test_sample_strategy() {
        let mut broken = valid_record();
        broken.as_object_mut().unwrap().remove("tags");
        let records = vec![valid_record(), broken];

        assert!(validate(&records, SampleStrategy::FirstRecord).compatible);

        let all = validate(&records, SampleStrategy::AllRecords);
        assert!(!all.compatible);
        assert_eq!(all.records_checked, 2);
        assert!(all.problems[0].starts_with("record 1"));
    }

    #[test]
    fn test_empty_array_is_compatible() {
        let report = validate(&[], SampleStrategy::FirstRecord);
        assert!(report.compatible);
        assert_eq!(report.records_checked, 0);
    }

    #[test]
    fn test_parse_payload_shapes() {
        assert_eq!(parse_payload(b"[]").unwrap().len(), 0);
        assert!(matches!(parse_payload(b"{\"a\":1}"), Err(SourceErrorKind::Incompatible(_))));
        assert!(matches!(parse_payload(b"not json"), Err(SourceErrorKind::Parse(_))));
    }
}
