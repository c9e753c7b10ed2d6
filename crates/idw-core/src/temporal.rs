//! # Temporal Types — Millisecond Timestamps
//!
//! Defines `Timestamp`, the UTC instant carried in signed content, commitments,
//! credentials and encryption envelopes. On the wire a timestamp is a
//! big-endian `int64` of milliseconds since the Unix epoch, so the type keeps
//! exactly millisecond precision: anything finer is truncated at construction.
//!
//! ## Invariant
//!
//! Timestamps written into signed content must be strictly positive.
//! [`Timestamp::from_millis`] accepts any representable instant (decoders need
//! to report the offending value), and [`Timestamp::is_positive`] is checked
//! where the format requires it.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// A UTC instant with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self(truncate_to_millis(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-millisecond parts.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_millis(dt))
    }

    /// Create a timestamp from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Result<Self, EncodingError> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(Self)
            .ok_or_else(|| EncodingError::InvalidValue(format!("timestamp {millis} is out of range")))
    }

    /// Milliseconds since the Unix epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// True if the timestamp lies strictly after the epoch.
    pub fn is_positive(&self) -> bool {
        self.as_millis() > 0
    }

    /// The instant `duration` earlier, saturating at the epoch.
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        let shifted = self.as_millis().saturating_sub(millis).max(0);
        Utc.timestamp_millis_opt(shifted).single().map(Self).unwrap_or(*self)
    }

    /// The instant `duration` later, or `self` if that is not representable.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        let shifted = self.as_millis().saturating_add(millis);
        Utc.timestamp_millis_opt(shifted).single().map(Self).unwrap_or(*self)
    }

    /// True if this instant lies more than `window` before `now`.
    pub fn is_older_than(&self, window: Duration, now: Timestamp) -> bool {
        *self < now.saturating_sub(window)
    }

    /// Render as RFC 3339 with millisecond precision and `Z` suffix.
    pub fn to_rfc3339(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Truncate a `DateTime<Utc>` to millisecond precision.
fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = dt.nanosecond() / 1_000_000 * 1_000_000;
    dt.with_nanosecond(nanos).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn test_now_has_no_submillis() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let dt = dt.with_nanosecond(123_456_789).unwrap();
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.to_rfc3339(), "2026-01-15T12:30:45.123Z");
    }

    #[test]
    fn test_millis_roundtrip() {
        let ts = Timestamp::from_millis(1_768_478_400_123).unwrap();
        assert_eq!(ts.as_millis(), 1_768_478_400_123);
        assert!(ts.is_positive());
    }

    #[test]
    fn test_epoch_is_not_positive() {
        assert!(!Timestamp::from_millis(0).unwrap().is_positive());
        assert!(!Timestamp::from_millis(-5).unwrap().is_positive());
    }

    #[test]
    fn test_out_of_range_millis_rejected() {
        assert!(Timestamp::from_millis(i64::MAX).is_err());
    }

    #[test]
    fn test_is_older_than() {
        let now = Timestamp::from_millis(100 * 86_400_000).unwrap();
        let recent = now.saturating_sub(DAY);
        let old = now.saturating_sub(DAY * 3);
        assert!(!recent.is_older_than(DAY * 2, now));
        assert!(old.is_older_than(DAY * 2, now));
    }

    #[test]
    fn test_saturating_sub_stops_at_epoch() {
        let ts = Timestamp::from_millis(10).unwrap();
        assert_eq!(ts.saturating_sub(DAY).as_millis(), 0);
    }

    #[test]
    fn test_ordering() {
        let earlier = Timestamp::from_millis(1_000).unwrap();
        let later = earlier.saturating_add(Duration::from_millis(1));
        assert!(earlier < later);
    }

    #[test]
    fn test_serde_roundtrip() {
        let ts = Timestamp::from_millis(1_768_478_400_000).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }
}
