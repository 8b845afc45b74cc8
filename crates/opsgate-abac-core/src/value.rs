// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Type coercion shared by the comparison operators.
//!
//! Attribute values arrive as loosely-typed JSON from the subject, resource and
//! environment maps. These helpers give the operators one consistent view:
//! numbers and numeric strings compare numerically, ISO dates compare
//! chronologically, and booleans accept their string spellings.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Interprets a value as a finite number.
pub fn as_number(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
		_ => None,
	}
}

/// Interprets a value as a UTC instant.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` (read as UTC) and plain
/// `YYYY-MM-DD` dates (midnight UTC).
pub fn as_date(value: &Value) -> Option<DateTime<Utc>> {
	let s = value.as_str()?.trim();
	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Some(dt.with_timezone(&Utc));
	}
	if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
		return Some(naive.and_utc());
	}
	NaiveDate::parse_from_str(s, "%Y-%m-%d")
		.ok()
		.and_then(|d| d.and_hms_opt(0, 0, 0))
		.map(|naive| naive.and_utc())
}

/// Interprets a value as a boolean.
pub fn as_bool(value: &Value) -> Option<bool> {
	match value {
		Value::Bool(b) => Some(*b),
		Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
		Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
		_ => None,
	}
}

/// Returns true for strings, numbers and booleans.
pub fn is_scalar(value: &Value) -> bool {
	matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Renders a value as text for substring tests and template interpolation.
pub fn stringify(value: &Value) -> Cow<'_, str> {
	match value {
		Value::String(s) => Cow::Borrowed(s.as_str()),
		Value::Null => Cow::Borrowed(""),
		Value::Bool(b) => Cow::Owned(b.to_string()),
		Value::Number(n) => Cow::Owned(n.to_string()),
		other => Cow::Owned(other.to_string()),
	}
}

/// Equality after type coercion.
///
/// `null` never equals anything, including another `null`.
pub fn loosely_equal(left: &Value, right: &Value) -> bool {
	if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
		return l == r;
	}

	match (left, right) {
		(Value::Null, _) | (_, Value::Null) => false,
		(Value::Bool(_), _) | (_, Value::Bool(_)) => {
			matches!((as_bool(left), as_bool(right)), (Some(l), Some(r)) if l == r)
		}
		(Value::String(l), Value::String(r)) => {
			l == r || matches!((as_date(left), as_date(right)), (Some(l), Some(r)) if l == r)
		}
		(Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => left == right,
		_ => false,
	}
}

/// Orders two values numerically, or chronologically when both are dates.
///
/// Returns `None` when the pair is not orderable.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
	if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
		return l.partial_cmp(&r);
	}
	match (as_date(left), as_date(right)) {
		(Some(l), Some(r)) => Some(l.cmp(&r)),
		_ => None,
	}
}
