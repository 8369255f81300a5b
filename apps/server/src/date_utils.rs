//! Date parsing for external input and the timestamp wire format.

use chrono::NaiveDate;

use crate::error::AppError;

/// Wire format of booking and time slot timestamps, e.g. `25/12/2024 14:30`.
pub const DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

/// Parse a calendar date given as `dd/MM/yyyy` or `yyyy-MM-dd`.
pub fn parse_date(input: &str) -> Result<NaiveDate, AppError> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .ok_or_else(|| AppError::validation(format!("Invalid date: {input}")))
}

/// Serde adapter for `NaiveDateTime` fields using [`DATETIME_FORMAT`].
pub mod datetime_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::DATETIME_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
