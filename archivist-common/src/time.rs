//! Timestamp utilities
//!
//! All persisted timestamps are RFC 3339 UTC strings with microsecond
//! precision, so they sort lexically and advance between touches made
//! within the same second.

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way every table stores it
pub fn to_db_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current timestamp in storage format
pub fn now_string() -> String {
    to_db_string(now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_db_string_format() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();
        assert_eq!(to_db_string(ts), "2024-01-01T12:30:00.000000Z");
    }

    #[tokio::test]
    async fn test_successive_strings_sort_in_order() {
        let first = now_string();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = now_string();
        assert!(second > first, "{} should sort after {}", second, first);
    }
}
