//! Natural keys for duplicate detection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Combination of ordinary meeting columns that should identify one meeting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NaturalKey {
    /// `(workgroup_id, date, host, purpose)`, the key derived meeting ids hash
    #[default]
    Meeting,
    /// `(workgroup_id, date, host)`: also catches meetings whose purpose text was edited
    MeetingDateHost,
}

impl NaturalKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            NaturalKey::Meeting => "meeting",
            NaturalKey::MeetingDateHost => "meeting-date-host",
        }
    }

    /// Key values of one meeting row, host and purpose already trimmed
    pub fn values(&self, workgroup_id: &str, date: &str, host: &str, purpose: &str) -> Vec<String> {
        match self {
            NaturalKey::Meeting => vec![
                workgroup_id.to_string(),
                date.to_string(),
                host.to_string(),
                purpose.to_string(),
            ],
            NaturalKey::MeetingDateHost => {
                vec![workgroup_id.to_string(), date.to_string(), host.to_string()]
            }
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NaturalKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "meeting" => Ok(NaturalKey::Meeting),
            "meeting-date-host" => Ok(NaturalKey::MeetingDateHost),
            other => Err(format!(
                "unknown natural key '{}' (expected meeting or meeting-date-host)",
                other
            )),
        }
    }
}
