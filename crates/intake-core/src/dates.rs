//! # Calendar Dates
//!
//! Dates travel in two formats:
//! - wire format `yyyy-MM-dd` (every payload, every cached record)
//! - display format `dd-MM-yyyy` (what the date pickers show)
//!
//! Parsing accepts both; formatting for the backend always produces the
//! wire format.

use crate::types::IntakeError;
use chrono::{Local, NaiveDate};

/// `yyyy-MM-dd`
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

/// `dd-MM-yyyy`
pub const DISPLAY_DATE_FORMAT: &str = "%d-%m-%Y";

/// Parse a wire-format date. Surrounding whitespace is ignored.
#[must_use]
pub fn parse_wire(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), WIRE_DATE_FORMAT).ok()
}

/// Parse a date in wire format first, then display format.
///
/// A full ISO timestamp (`2024-01-01T00:00:00`) is accepted by reading its
/// date part, which is how persisted metric rows come back from the backend.
#[must_use]
pub fn parse_flexible(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(date) = parse_wire(trimmed) {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DISPLAY_DATE_FORMAT) {
        return Some(date);
    }
    trimmed
        .split_once('T')
        .and_then(|(date_part, _)| parse_wire(date_part))
}

/// Parse a date that must be present, in either format.
pub fn parse_required(raw: &str) -> Result<NaiveDate, IntakeError> {
    parse_flexible(raw).ok_or_else(|| IntakeError::InvalidDate(raw.trim().to_string()))
}

/// Format a date for the backend.
#[must_use]
pub fn to_wire(date: NaiveDate) -> String {
    date.format(WIRE_DATE_FORMAT).to_string()
}

/// Format a date for people.
#[must_use]
pub fn to_display(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Today's calendar date in the local timezone (midnight-normalized).
#[must_use]
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Serde adapter for optional dates that accepts both formats on input and
/// writes the wire format.
pub mod flexible_opt {
    use super::{parse_flexible, to_wire};
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&to_wire(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_flexible(text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date: {text}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_wire_and_display_formats() {
        assert_eq!(parse_flexible("2024-03-01"), Some(date(2024, 3, 1)));
        assert_eq!(parse_flexible("01-03-2024"), Some(date(2024, 3, 1)));
        assert_eq!(parse_flexible(" 2024-03-01 "), Some(date(2024, 3, 1)));
    }

    #[test]
    fn parses_timestamp_date_part() {
        assert_eq!(
            parse_flexible("2024-06-01T00:00:00.000Z"),
            Some(date(2024, 6, 1))
        );
    }

    #[test]
    fn rejects_non_calendar_dates() {
        assert_eq!(parse_flexible("2024-02-30"), None);
        assert_eq!(parse_flexible("not a date"), None);
        assert_eq!(parse_flexible(""), None);
    }

    #[test]
    fn parse_required_reports_input() {
        let err = parse_required(" 31-02-2024 ").expect_err("invalid");
        assert_eq!(err.to_string(), "Invalid date: 31-02-2024");
    }

    #[test]
    fn formats_wire_and_display() {
        let d = date(2024, 1, 9);
        assert_eq!(to_wire(d), "2024-01-09");
        assert_eq!(to_display(d), "09-01-2024");
    }

    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct Holder {
        #[serde(default, with = "flexible_opt")]
        when: Option<NaiveDate>,
    }

    #[test]
    fn flexible_serde_normalizes_to_wire() {
        let holder: Holder = serde_json::from_str(r#"{"when":"15-08-2024"}"#).expect("parse");
        assert_eq!(holder.when, Some(date(2024, 8, 15)));
        let json = serde_json::to_string(&holder).expect("serialize");
        assert_eq!(json, r#"{"when":"2024-08-15"}"#);
    }

    #[test]
    fn flexible_serde_treats_blank_as_none() {
        let holder: Holder = serde_json::from_str(r#"{"when":""}"#).expect("parse");
        assert_eq!(holder.when, None);
        let missing: Holder = serde_json::from_str("{}").expect("parse");
        assert_eq!(missing.when, None);
    }
}
