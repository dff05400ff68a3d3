use crate::error::{AnalysisError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a wire date into a calendar date.
///
/// Timestamps carrying an offset are moved to UTC first, so
/// `2024-03-01T01:30:00+03:00` becomes `2024-02-29`. Timestamps without an
/// offset are taken as UTC.
pub fn parse_wire_date(raw: &str) -> Result<NaiveDate> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.date());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AnalysisError::InvalidDate(raw.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn deserialize_wire_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_wire_date(&raw).map_err(serde::de::Error::custom)
}

/// `null`, a missing key and `""` all mean "no date".
pub(crate) fn deserialize_optional_wire_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => parse_wire_date(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        let date = parse_wire_date("2024-01-15").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_utc_timestamp_drops_time_of_day() {
        let date = parse_wire_date("2024-01-15T23:59:59.999Z").unwrap();
        assert_eq!(format_date(date), "2024-01-15");
    }

    #[test]
    fn test_parse_offset_timestamp_uses_utc_calendar_day() {
        let date = parse_wire_date("2024-03-01T01:30:00+03:00").unwrap();
        assert_eq!(format_date(date), "2024-02-29");
    }

    #[test]
    fn test_parse_naive_timestamp() {
        let date = parse_wire_date("2023-12-31T18:00:00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        let date = parse_wire_date("2023-12-31 08:15:00.250").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_wire_date("next tuesday").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDate(ref raw) if raw == "next tuesday"));
        assert!(parse_wire_date("2024-02-30").is_err());
    }
}
