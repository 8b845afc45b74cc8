// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `{{path}}` substitution in condition values.

use serde_json::Value;

use crate::resolver::{resolve, EvaluationContext};
use crate::value::stringify;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Returns true if a string carries at least one `{{...}}` placeholder.
pub fn is_template(s: &str) -> bool {
	s.find(OPEN)
		.is_some_and(|start| s[start + OPEN.len()..].contains(CLOSE))
}

/// Returns the attribute path when the whole string is a single placeholder.
pub fn whole_template_path(s: &str) -> Option<&str> {
	let inner = s.strip_prefix(OPEN)?.strip_suffix(CLOSE)?;
	if inner.contains(OPEN) || inner.contains(CLOSE) {
		return None;
	}
	Some(inner.trim())
}

/// Resolves placeholders in a condition value.
///
/// A string that is exactly one placeholder becomes the resolved value itself,
/// keeping its type, or `None` when undefined. Placeholders mixed with text are
/// interpolated, with undefined fragments rendered empty. Arrays and objects
/// are resolved element-wise, undefined elements becoming `null`.
pub fn resolve_template(value: &Value, ctx: &EvaluationContext<'_>) -> Option<Value> {
	match value {
		Value::String(s) => {
			if let Some(path) = whole_template_path(s) {
				return resolve(path, ctx);
			}
			if !is_template(s) {
				return Some(value.clone());
			}
			Some(Value::String(interpolate(s, ctx)))
		}
		Value::Array(items) => Some(Value::Array(
			items
				.iter()
				.map(|item| resolve_template(item, ctx).unwrap_or(Value::Null))
				.collect(),
		)),
		Value::Object(map) => Some(Value::Object(
			map.iter()
				.map(|(key, item)| {
					(key.clone(), resolve_template(item, ctx).unwrap_or(Value::Null))
				})
				.collect(),
		)),
		_ => Some(value.clone()),
	}
}

fn interpolate(s: &str, ctx: &EvaluationContext<'_>) -> String {
	let mut out = String::with_capacity(s.len());
	let mut rest = s;

	while let Some(start) = rest.find(OPEN) {
		let after_open = &rest[start + OPEN.len()..];
		let Some(end) = after_open.find(CLOSE) else {
			break;
		};
		out.push_str(&rest[..start]);
		if let Some(resolved) = resolve(after_open[..end].trim(), ctx) {
			out.push_str(&stringify(&resolved));
		}
		rest = &after_open[end + CLOSE.len()..];
	}

	out.push_str(rest);
	out
}
