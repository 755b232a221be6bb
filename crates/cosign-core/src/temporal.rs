//! # Temporal Types: UTC-Only Timestamps
//!
//! Signature payloads embed a timestamp, and the audit path rebuilds the
//! payload from the stored value. The stored string must therefore reproduce
//! exactly the bytes that were signed.
//!
//! [`Timestamp`] is UTC-only, truncated to milliseconds, and always renders
//! as `YYYY-MM-DDTHH:MM:SS.mmmZ`. Non-UTC inputs are rejected at parse time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A UTC timestamp with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// From a `DateTime<Utc>`, truncating sub-millisecond precision.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        let millis = dt.timestamp_millis();
        Self(DateTime::from_timestamp_millis(millis).unwrap_or(dt))
    }

    /// From milliseconds since the Unix epoch.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Parse an RFC 3339 string carrying the `Z` suffix.
    ///
    /// Explicit offsets, including `+00:00`, are rejected.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must be UTC with Z suffix".to_string(),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Milliseconds since the Unix epoch.
    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// The underlying `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Canonical rendering, `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_millis_with_z() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.to_string(), "2026-01-15T12:00:00.000Z");
    }

    #[test]
    fn truncates_sub_millisecond() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(1_234_567);
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.to_string(), "2026-01-15T12:00:00.001Z");
    }

    #[test]
    fn parse_roundtrip() {
        let ts = Timestamp::parse("2026-03-01T08:30:15.250Z").unwrap();
        assert_eq!(ts.to_string(), "2026-03-01T08:30:15.250Z");
        assert_eq!(Timestamp::parse(&ts.to_string()).unwrap(), ts);
    }

    #[test]
    fn parse_accepts_second_precision() {
        let ts = Timestamp::parse("2026-03-01T08:30:15Z").unwrap();
        assert_eq!(ts.to_string(), "2026-03-01T08:30:15.000Z");
    }

    #[test]
    fn rejects_offsets() {
        assert!(Timestamp::parse("2026-03-01T08:30:15+00:00").is_err());
        assert!(Timestamp::parse("2026-03-01T08:30:15+05:30").is_err());
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn serde_uses_string_form() {
        let ts = Timestamp::from_unix_millis(1_700_000_000_123).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2023-11-14T22:13:20.123Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn ordering_follows_time() {
        let a = Timestamp::from_unix_millis(1_000).unwrap();
        let b = Timestamp::from_unix_millis(2_000).unwrap();
        assert!(a < b);
        assert_eq!(b.unix_millis(), 2_000);
    }
}
