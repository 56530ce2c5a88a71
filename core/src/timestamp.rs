//! Fixed-width timestamp encoding for stored documents.
//!
//! Every persisted timestamp is an RFC 3339 UTC string with exactly six
//! fractional digits (`2026-03-01T18:30:00.000000Z`), so comparing the stored
//! strings lexically gives the same order as comparing the instants. Use with
//! `#[serde(with = "rsvp_core::timestamp")]`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Format an instant the way documents store it.
#[must_use]
pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The stored form as a JSON value, for patches and query cursors.
#[must_use]
pub fn to_json(at: &DateTime<Utc>) -> serde_json::Value {
    serde_json::Value::String(format(at))
}

/// Parse a stored timestamp.
///
/// # Errors
///
/// Returns an error if `raw` is not RFC 3339.
pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
}

/// Serialize a timestamp in stored form.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(at))
}

/// Deserialize a stored timestamp.
///
/// # Errors
///
/// Fails if the value is not an RFC 3339 string.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// Same encoding for optional timestamps (`null` when absent).
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional timestamp.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        at: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match at {
            Some(at) => serializer.serialize_str(&super::format(at)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional timestamp.
    ///
    /// # Errors
    ///
    /// Fails if a present value is not an RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).single().expect("valid date");
        assert_eq!(format(&whole), "2026-03-01T18:30:00.000000Z");
    }

    #[test]
    fn test_lexical_order_matches_chronological_order() {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).single().expect("valid date");
        let later = base + Duration::microseconds(1);
        let much_later = base + Duration::seconds(10);

        assert!(format(&base) < format(&later));
        assert!(format(&later) < format(&much_later));
    }

    #[test]
    fn test_parse_round_trips_microseconds() {
        let at = Utc::now();
        let parsed = parse(&format(&at)).ok();
        assert_eq!(
            parsed.map(|p| p.timestamp_micros()),
            Some(at.timestamp_micros())
        );
    }
}
