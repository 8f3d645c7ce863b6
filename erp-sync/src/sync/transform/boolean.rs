//! Legacy boolean encodings

use serde_json::Value;

const TRUE_STRINGS: &[&str] = &["true", "1", "yes", "y", "t"];

/// Interpret a legacy boolean
///
/// `None` means the value says nothing (null, blank text, arrays, objects)
/// and the caller's default applies.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(TRUE_STRINGS.contains(&s.to_lowercase().as_str()))
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Boolean with an explicit default for absent or unspecified values
pub fn normalize_bool(value: Option<&Value>, default: bool) -> bool {
    value.and_then(parse_bool).unwrap_or(default)
}
