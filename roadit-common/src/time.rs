//! Timestamp utilities
//!
//! Issue timestamps carry millisecond precision. That is what the persisted
//! slot format can represent, so anything produced by a [`Clock`] survives a
//! save/load cycle unchanged.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Mutex;

/// Get current UTC timestamp, truncated to milliseconds
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Source of "now" for the record store
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

/// Manually driven clock for tests and replay tooling
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start.trunc_subsecs(3)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = (*current + by).trunc_subsecs(3);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Serde adapter writing `YYYY-MM-DDTHH:MM:SS.sssZ` and reading any RFC 3339
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parse RFC 3339, truncating anything finer than a millisecond
    pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc).trunc_subsecs(3))
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => serializer.serialize_str(&super::format(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Timelike};

    #[test]
    fn test_now_is_millisecond_precision() {
        let timestamp = now();
        assert_eq!(timestamp.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 7, 15, 10, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::milliseconds(1500));
        assert_eq!(clock.now(), start + Duration::milliseconds(1500));
    }

    #[test]
    fn test_manual_clock_truncates_sub_millisecond_input() {
        let start = Utc.with_ymd_and_hms(2025, 7, 15, 10, 0, 0).unwrap()
            + Duration::nanoseconds(1_234_567);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now().nanosecond(), 1_000_000);
    }

    #[test]
    fn test_iso_millis_format() {
        let dt = Utc.with_ymd_and_hms(2025, 7, 18, 16, 45, 0).unwrap()
            + Duration::milliseconds(7);
        assert_eq!(iso_millis::format(&dt), "2025-07-18T16:45:00.007Z");
    }

    #[test]
    fn test_iso_millis_parse_accepts_offsets() {
        let parsed = iso_millis::parse("2025-07-18T22:15:00+05:30").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 7, 18, 16, 45, 0).unwrap());
    }

    #[test]
    fn test_iso_millis_parse_truncates_to_millis() {
        let parsed = iso_millis::parse("2025-07-18T16:45:00.123456789Z").unwrap();
        assert_eq!(parsed.nanosecond(), 123_000_000);
        assert_eq!(iso_millis::format(&parsed), "2025-07-18T16:45:00.123Z");
    }

    #[test]
    fn test_iso_millis_parse_rejects_garbage() {
        assert!(iso_millis::parse("yesterday").is_err());
    }
}
