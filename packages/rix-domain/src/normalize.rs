//! Field readers for documents coming back from a multi-valued-field-capable store.
//!
//! Any field may arrive as a scalar or as an ordered sequence. Readers take the first
//! element of a sequence and fall back to the type's zero value when the field is absent,
//! null, an empty sequence, or of an unusable shape.

use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Collapses a scalar-or-sequence field to its first usable value.
pub fn first(value: Option<&Value>) -> Option<&Value> {
	match value? {
		Value::Null => None,
		Value::Array(items) => items.first().filter(|item| !item.is_null()),
		other => Some(other),
	}
}

pub fn string_field(doc: &Value, field: &str) -> String {
	opt_string(doc, field).unwrap_or_default()
}

pub fn opt_string(doc: &Value, field: &str) -> Option<String> {
	match first(doc.get(field))? {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

pub fn i64_field(doc: &Value, field: &str) -> i64 {
	opt_i64(doc, field).unwrap_or_default()
}

pub fn opt_i64(doc: &Value, field: &str) -> Option<i64> {
	match first(doc.get(field))? {
		Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|v| v as i64)),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

pub fn f64_field(doc: &Value, field: &str) -> f64 {
	opt_f64(doc, field).unwrap_or_default()
}

pub fn opt_f64(doc: &Value, field: &str) -> Option<f64> {
	match first(doc.get(field))? {
		Value::Number(number) => number.as_f64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

pub fn bool_field(doc: &Value, field: &str) -> bool {
	match first(doc.get(field)) {
		Some(Value::Bool(flag)) => *flag,
		Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
		Some(Value::Number(number)) => number.as_i64().is_some_and(|v| v != 0),
		_ => false,
	}
}

/// RFC 3339 timestamps; anything unparsable reads as absent.
pub fn timestamp_field(doc: &Value, field: &str) -> Option<OffsetDateTime> {
	let raw = opt_string(doc, field)?;

	OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}
