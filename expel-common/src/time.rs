//! Timestamp utilities
//!
//! Records persist timestamps as fixed-width RFC 3339 UTC strings with
//! microsecond precision, so lexical order in the database equals
//! chronological order.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::{Error, Result};

/// Current UTC timestamp at storage precision
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp for storage (`2026-01-02T03:04:05.000006Z`)
pub fn to_storage(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp back into UTC
pub fn from_storage(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_now_survives_storage_round_trip() {
        let timestamp = now();
        assert_eq!(from_storage(&to_storage(&timestamp)).unwrap(), timestamp);
    }

    #[test]
    fn test_storage_format_is_fixed_width() {
        let whole_second = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let fractional = whole_second + Duration::microseconds(6);

        assert_eq!(to_storage(&whole_second), "2026-01-02T03:04:05.000000Z");
        assert_eq!(to_storage(&fractional), "2026-01-02T03:04:05.000006Z");
    }

    #[test]
    fn test_storage_order_matches_chronological_order() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let later = earlier + Duration::milliseconds(250);
        assert!(to_storage(&earlier) < to_storage(&later));
    }

    #[test]
    fn test_storage_parse_preserves_value() {
        let original = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap() + Duration::microseconds(123_456);
        let parsed = from_storage(&to_storage(&original)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(from_storage("yesterday"), Err(Error::Internal(_))));
    }
}
