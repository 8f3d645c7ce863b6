//! Legacy `D!M!YYYY` date handling

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::models::RawRecord;

static LEGACY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})!(\d{1,2})!(\d{1,4})$").expect("valid date pattern"));

/// Result of parsing a legacy date string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyDate {
    /// A real calendar date
    Date(NaiveDate),
    /// The `0!0!0` placeholder
    Empty,
    /// Not a legacy date; keep the original text
    Unparsed,
}

/// Parse a `D!M!YYYY` string
pub fn parse_legacy_date(input: &str) -> LegacyDate {
    let Some(caps) = LEGACY_DATE.captures(input.trim()) else {
        return LegacyDate::Unparsed;
    };

    let part = |i: usize| caps[i].parse::<u32>().ok();
    let (Some(day), Some(month), Some(year)) = (part(1), part(2), part(3)) else {
        return LegacyDate::Unparsed;
    };

    if day == 0 && month == 0 && year == 0 {
        return LegacyDate::Empty;
    }
    if caps[3].len() != 4 {
        return LegacyDate::Unparsed;
    }

    match NaiveDate::from_ymd_opt(year as i32, month, day) {
        Some(date) => LegacyDate::Date(date),
        None => LegacyDate::Unparsed,
    }
}

/// Rewrite the allow-listed date fields of a record in place
///
/// Parsed dates become ISO `YYYY-MM-DD` strings and placeholders become
/// null. Anything else, including non-string values, is left untouched.
pub fn normalize_dates(record: &mut RawRecord, date_fields: &[String]) {
    for field in date_fields {
        let Some(value) = record.get_mut(field) else {
            continue;
        };
        let Some(text) = value.as_str() else {
            continue;
        };

        match parse_legacy_date(text) {
            LegacyDate::Date(date) => *value = Value::String(date.format("%Y-%m-%d").to_string()),
            LegacyDate::Empty => *value = Value::Null,
            LegacyDate::Unparsed => {
                log::trace!("Leaving unparsable date in '{}': {:?}", field, text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_date() {
        assert_eq!(
            parse_legacy_date("15!1!2023"),
            LegacyDate::Date(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap())
        );
        assert_eq!(
            parse_legacy_date("01!12!1999"),
            LegacyDate::Date(NaiveDate::from_ymd_opt(1999, 12, 1).unwrap())
        );
    }

    #[test]
    fn test_parse_placeholder() {
        assert_eq!(parse_legacy_date("0!0!0"), LegacyDate::Empty);
        assert_eq!(parse_legacy_date("00!00!0000"), LegacyDate::Empty);
    }

    #[test]
    fn test_parse_garbage_is_unparsed() {
        assert_eq!(parse_legacy_date("2023-01-15"), LegacyDate::Unparsed);
        assert_eq!(parse_legacy_date("n/a"), LegacyDate::Unparsed);
        assert_eq!(parse_legacy_date("31!2!2023"), LegacyDate::Unparsed);
        assert_eq!(parse_legacy_date("1!1!23"), LegacyDate::Unparsed);
        assert_eq!(parse_legacy_date(""), LegacyDate::Unparsed);
    }

    #[test]
    fn test_normalize_only_touches_allow_list() {
        let mut record = RawRecord::from_value(json!({
            "CreatedOn": "15!1!2023",
            "ModifiedOn": "0!0!0",
            "ReleaseDate": "soon",
            "Note": "15!1!2023",
            "ValidFrom": 20230115
        }))
        .unwrap();

        let fields: Vec<String> = ["CreatedOn", "ModifiedOn", "ReleaseDate", "ValidFrom"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        normalize_dates(&mut record, &fields);

        assert_eq!(record.get("CreatedOn"), Some(&json!("2023-01-15")));
        assert_eq!(record.get("ModifiedOn"), Some(&Value::Null));
        assert_eq!(record.get("ReleaseDate"), Some(&json!("soon")));
        assert_eq!(record.get("Note"), Some(&json!("15!1!2023")));
        assert_eq!(record.get("ValidFrom"), Some(&json!(20230115)));
    }
}
