//! Lenient timestamp parsing for JSON payloads.
//!
//! Accepts RFC 3339 with an offset (`2024-06-01T09:00:00.000Z`), a naive
//! date-time with optional fractional seconds, or a bare date. Zoned values
//! are normalised to UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Ok(zoned.naive_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("'{raw}' is not an ISO 8601 date or date-time"))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

pub fn deserialize_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse(&raw).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn zulu_with_millis() {
        assert_eq!(parse("2024-06-01T09:00:00.000Z").unwrap(), at(9, 0));
    }

    #[test]
    fn offsets_normalise_to_utc() {
        assert_eq!(parse("2024-06-01T09:00:00+00:00").unwrap(), at(9, 0));
        assert_eq!(parse("2024-06-01T04:30:00-05:00").unwrap(), at(9, 30));
    }

    #[test]
    fn naive_and_date_only() {
        assert_eq!(parse("2024-06-01T09:00:00").unwrap(), at(9, 0));
        assert_eq!(parse("2024-06-01T09:00:00.250").unwrap().time().to_string(), "09:00:00.250");
        assert_eq!(parse("2024-06-01").unwrap(), at(0, 0));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = parse("ayer").unwrap_err();
        assert!(err.contains("ayer"));
    }
}
