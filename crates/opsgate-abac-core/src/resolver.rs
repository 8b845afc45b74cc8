// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute resolution against a request.
//!
//! Paths are dotted: the first segment selects the source and the rest walks
//! into it.
//!
//! | root | source |
//! |---|---|
//! | `user`, `subject` | `id`, `type`, then the subject attribute map |
//! | `resource` | explicit resource attributes, else `type`/`id` from `type:id` |
//! | `environment` | request context, with clock-derived defaults |
//!
//! Resolution never fails. Anything that cannot be found, including JSON
//! `null`, is undefined (`None`).

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde_json::{Map, Value};

use crate::types::EvaluationRequest;

/// Attribute roots the resolver understands.
pub const ATTRIBUTE_ROOTS: [&str; 4] = ["user", "subject", "resource", "environment"];

/// Everything a single decision resolves attributes against.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
	pub request: &'a EvaluationRequest,
	/// Wall-clock instant of the decision, fixed for its whole duration.
	pub now: DateTime<Utc>,
}

impl<'a> EvaluationContext<'a> {
	pub fn new(request: &'a EvaluationRequest, now: DateTime<Utc>) -> Self {
		Self { request, now }
	}
}

/// Resolves a dotted attribute path.
pub fn resolve(path: &str, ctx: &EvaluationContext<'_>) -> Option<Value> {
	let (root, rest) = path.trim().split_once('.')?;
	let value = match root {
		"user" | "subject" => resolve_subject(rest, ctx.request),
		"resource" => resolve_resource(rest, ctx.request),
		"environment" => resolve_environment(rest, ctx),
		_ => None,
	};
	value.filter(|v| !v.is_null())
}

fn resolve_subject(rest: &str, request: &EvaluationRequest) -> Option<Value> {
	let subject = &request.subject;
	match rest {
		"id" => Some(Value::String(subject.id.clone())),
		"type" => Some(Value::String(subject.subject_type.clone())),
		_ => lookup(&subject.attributes, rest),
	}
}

fn resolve_resource(rest: &str, request: &EvaluationRequest) -> Option<Value> {
	if let Some(attributes) = &request.resource_attributes {
		return lookup(attributes, rest);
	}

	let resource = request.resource.as_str();
	match (rest, resource.split_once(':')) {
		("type", Some((resource_type, _))) => Some(Value::String(resource_type.to_string())),
		("id", Some((_, id))) => Some(Value::String(id.to_string())),
		("type", None) if !resource.is_empty() => Some(Value::String(resource.to_string())),
		_ => None,
	}
}

fn resolve_environment(rest: &str, ctx: &EvaluationContext<'_>) -> Option<Value> {
	if let Some(value) = lookup(&ctx.request.context, rest) {
		return Some(value);
	}

	let now = ctx.now;
	match rest {
		"hour" => Some(Value::from(now.hour())),
		"day_of_week" => Some(Value::String(weekday_name(now.weekday()).to_string())),
		"date" => Some(Value::String(now.format("%Y-%m-%d").to_string())),
		"timestamp" => Some(Value::String(now.to_rfc3339())),
		_ => None,
	}
}

fn weekday_name(day: Weekday) -> &'static str {
	match day {
		Weekday::Mon => "monday",
		Weekday::Tue => "tuesday",
		Weekday::Wed => "wednesday",
		Weekday::Thu => "thursday",
		Weekday::Fri => "friday",
		Weekday::Sat => "saturday",
		Weekday::Sun => "sunday",
	}
}

/// Walks a dotted path through nested objects and arrays.
fn lookup(map: &Map<String, Value>, path: &str) -> Option<Value> {
	let mut segments = path.split('.');
	let mut current = map.get(segments.next()?)?;
	for segment in segments {
		current = match current {
			Value::Object(inner) => inner.get(segment)?,
			Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}
	Some(current.clone())
}
