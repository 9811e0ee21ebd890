//! Input sanitization functions
//!
//! Raw form fields are normalized into bounded plain text before any
//! validation runs. Sanitizing never fails.

use serde_json::Value;
use std::borrow::Cow;

/// Maximum length, in characters, of any sanitized field
pub const MAX_FIELD_CHARS: usize = 5000;

/// Strip carriage returns, trim surrounding whitespace and cap the length.
/// Absent input yields an empty string.
pub fn sanitize_text(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let without_cr: String = value.chars().filter(|c| *c != '\r').collect();
    without_cr.trim().chars().take(MAX_FIELD_CHARS).collect()
}

/// Render a JSON field as text the way a loosely typed form body is read:
/// falsy values (`null`, `false`, `0`, `""`) become absent, other scalars use
/// their literal text and nested values their compact JSON encoding.
pub fn field_text(value: Option<&Value>) -> Option<Cow<'_, str>> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(Cow::Borrowed("true")),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Sanitize a named field of a JSON payload
pub fn sanitize_field(payload: &Value, field: &str) -> String {
    let text = field_text(payload.get(field));
    sanitize_text(text.as_deref())
}
