// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Condition operators and their typed semantics.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ValidationError;
use crate::value::{compare, is_scalar, loosely_equal, stringify};

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
	Equals,
	NotEquals,
	GreaterThan,
	LessThan,
	GreaterThanOrEquals,
	LessThanOrEquals,
	In,
	NotIn,
	Contains,
	StartsWith,
	EndsWith,
	Matches,
	Between,
}

impl Operator {
	pub const ALL: [Operator; 13] = [
		Operator::Equals,
		Operator::NotEquals,
		Operator::GreaterThan,
		Operator::LessThan,
		Operator::GreaterThanOrEquals,
		Operator::LessThanOrEquals,
		Operator::In,
		Operator::NotIn,
		Operator::Contains,
		Operator::StartsWith,
		Operator::EndsWith,
		Operator::Matches,
		Operator::Between,
	];

	/// Canonical wire symbol.
	pub fn as_str(&self) -> &'static str {
		match self {
			Operator::Equals => "=",
			Operator::NotEquals => "!=",
			Operator::GreaterThan => ">",
			Operator::LessThan => "<",
			Operator::GreaterThanOrEquals => ">=",
			Operator::LessThanOrEquals => "<=",
			Operator::In => "IN",
			Operator::NotIn => "NOT_IN",
			Operator::Contains => "CONTAINS",
			Operator::StartsWith => "STARTS_WITH",
			Operator::EndsWith => "ENDS_WITH",
			Operator::Matches => "MATCHES",
			Operator::Between => "BETWEEN",
		}
	}

	/// Evaluates the operator.
	///
	/// `actual` is `None` when the attribute is undefined. The only failure is
	/// an uncompilable `MATCHES` pattern, reported whatever the attribute holds.
	pub fn evaluate(
		&self,
		actual: Option<&Value>,
		expected: &Value,
		patterns: &mut PatternCache,
	) -> Result<bool, regex::Error> {
		let pattern = match (self, expected.as_str()) {
			(Operator::Matches, Some(pattern)) => Some(patterns.get(pattern)?),
			_ => None,
		};

		let Some(actual) = actual else {
			// Absence differs from every concrete value.
			return Ok(matches!(self, Operator::NotEquals | Operator::NotIn));
		};

		let result = match self {
			Operator::Equals => loosely_equal(actual, expected),
			Operator::NotEquals => !loosely_equal(actual, expected),
			Operator::GreaterThan => ordered(actual, expected, |o| o == Ordering::Greater),
			Operator::LessThan => ordered(actual, expected, |o| o == Ordering::Less),
			Operator::GreaterThanOrEquals => ordered(actual, expected, |o| o != Ordering::Less),
			Operator::LessThanOrEquals => ordered(actual, expected, |o| o != Ordering::Greater),
			Operator::In => expected
				.as_array()
				.is_some_and(|list| list.iter().any(|v| loosely_equal(actual, v))),
			Operator::NotIn => expected
				.as_array()
				.is_some_and(|list| !list.iter().any(|v| loosely_equal(actual, v))),
			Operator::Contains => match actual {
				Value::Array(items) => items.iter().any(|v| loosely_equal(v, expected)),
				_ => text_test(actual, expected, |a, e| a.contains(e)),
			},
			Operator::StartsWith => text_test(actual, expected, |a, e| a.starts_with(e)),
			Operator::EndsWith => text_test(actual, expected, |a, e| a.ends_with(e)),
			Operator::Matches => {
				pattern.is_some_and(|re| is_scalar(actual) && re.is_match(&stringify(actual)))
			}
			Operator::Between => match expected.as_array().map(Vec::as_slice) {
				Some([low, high]) => {
					ordered(actual, low, |o| o != Ordering::Less)
						&& ordered(actual, high, |o| o != Ordering::Greater)
				}
				_ => false,
			},
		};
		Ok(result)
	}
}

fn ordered(actual: &Value, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
	compare(actual, expected).is_some_and(accept)
}

fn text_test(actual: &Value, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
	is_scalar(actual) && is_scalar(expected) && test(&stringify(actual), &stringify(expected))
}

impl fmt::Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Operator {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let op = match s.trim() {
			"=" | "==" => Operator::Equals,
			"!=" | "<>" => Operator::NotEquals,
			">" => Operator::GreaterThan,
			"<" => Operator::LessThan,
			">=" => Operator::GreaterThanOrEquals,
			"<=" => Operator::LessThanOrEquals,
			word => match word.to_ascii_uppercase().as_str() {
				"IN" => Operator::In,
				"NOT_IN" => Operator::NotIn,
				"CONTAINS" => Operator::Contains,
				"STARTS_WITH" => Operator::StartsWith,
				"ENDS_WITH" => Operator::EndsWith,
				"MATCHES" => Operator::Matches,
				"BETWEEN" => Operator::Between,
				_ => return Err(ValidationError::UnknownOperator(s.to_string())),
			},
		};
		Ok(op)
	}
}

impl Serialize for Operator {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for Operator {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Compiles `MATCHES` patterns once per decision.
///
/// The compiled program size is capped so a hostile pattern cannot blow up
/// evaluation cost.
#[derive(Debug)]
pub struct PatternCache {
	size_limit: usize,
	compiled: HashMap<String, Regex>,
}

impl PatternCache {
	pub fn new(size_limit: usize) -> Self {
		Self {
			size_limit,
			compiled: HashMap::new(),
		}
	}

	pub fn get(&mut self, pattern: &str) -> Result<&Regex, regex::Error> {
		match self.compiled.entry(pattern.to_string()) {
			Entry::Occupied(entry) => Ok(entry.into_mut()),
			Entry::Vacant(entry) => Ok(entry.insert(compile_pattern(pattern, self.size_limit)?)),
		}
	}
}

/// Compiles a pattern under a compiled-size limit.
pub fn compile_pattern(pattern: &str, size_limit: usize) -> Result<Regex, regex::Error> {
	RegexBuilder::new(pattern).size_limit(size_limit).build()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn eval(op: Operator, actual: Option<Value>, expected: Value) -> bool {
		let mut patterns = PatternCache::new(1 << 20);
		op.evaluate(actual.as_ref(), &expected, &mut patterns).unwrap()
	}

	#[test]
	fn parses_symbols_and_words() {
		assert_eq!("=".parse::<Operator>().unwrap(), Operator::Equals);
		assert_eq!("==".parse::<Operator>().unwrap(), Operator::Equals);
		assert_eq!("not_in".parse::<Operator>().unwrap(), Operator::NotIn);
		assert_eq!("BETWEEN".parse::<Operator>().unwrap(), Operator::Between);
		assert!("LIKE".parse::<Operator>().is_err());
	}

	#[test]
	fn every_operator_round_trips_its_symbol() {
		for op in Operator::ALL {
			assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
		}
	}

	mod undefined_attribute {
		use super::*;

		#[test]
		fn only_negative_operators_pass() {
			for op in Operator::ALL {
				let expected = match op {
					Operator::In | Operator::NotIn | Operator::Between => json!([1, 2]),
					_ => json!("x"),
				};
				let passed = eval(op, None, expected);
				assert_eq!(
					passed,
					matches!(op, Operator::NotEquals | Operator::NotIn),
					"{op}"
				);
			}
		}
	}

	mod comparisons {
		use super::*;

		#[test]
		fn ordering_is_numeric_aware() {
			assert!(eval(Operator::GreaterThan, Some(json!("10")), json!(9)));
			assert!(eval(Operator::LessThanOrEquals, Some(json!(9)), json!(9)));
			assert!(!eval(Operator::LessThan, Some(json!(9)), json!(9)));
		}

		#[test]
		fn ordering_handles_dates() {
			assert!(eval(
				Operator::GreaterThanOrEquals,
				Some(json!("2024-06-01")),
				json!("2024-01-01")
			));
		}

		#[test]
		fn non_orderable_is_false() {
			assert!(!eval(Operator::GreaterThan, Some(json!("abc")), json!(1)));
			assert!(!eval(Operator::LessThan, Some(json!("abc")), json!(1)));
			assert!(!eval(Operator::GreaterThanOrEquals, Some(json!(true)), json!(0)));
		}

		#[test]
		fn between_is_inclusive() {
			let range = json!([9, 17]);
			assert!(eval(Operator::Between, Some(json!(9)), range.clone()));
			assert!(eval(Operator::Between, Some(json!(17)), range.clone()));
			assert!(!eval(Operator::Between, Some(json!(8)), range.clone()));
			assert!(!eval(Operator::Between, Some(json!(18)), range));
		}

		#[test]
		fn between_with_malformed_range_is_false() {
			assert!(!eval(Operator::Between, Some(json!(5)), json!([1])));
			assert!(!eval(Operator::Between, Some(json!(5)), json!("1..9")));
		}
	}

	mod membership {
		use super::*;

		#[test]
		fn in_and_not_in() {
			let list = json!(["hr", "finance"]);
			assert!(eval(Operator::In, Some(json!("hr")), list.clone()));
			assert!(!eval(Operator::In, Some(json!("engineering")), list.clone()));
			assert!(eval(Operator::NotIn, Some(json!("engineering")), list.clone()));
			assert!(!eval(Operator::NotIn, Some(json!("hr")), list));
		}

		#[test]
		fn in_requires_an_array() {
			assert!(!eval(Operator::In, Some(json!("hr")), json!("hr")));
			assert!(!eval(Operator::NotIn, Some(json!("hr")), json!("finance")));
		}

		#[test]
		fn in_is_numeric_aware() {
			assert!(eval(Operator::In, Some(json!("3")), json!([1, 2, 3])));
		}
	}

	mod text {
		use super::*;

		#[test]
		fn substring_tests_are_case_sensitive() {
			assert!(eval(Operator::Contains, Some(json!("finance-eu")), json!("nce")));
			assert!(!eval(Operator::Contains, Some(json!("finance-eu")), json!("NCE")));
			assert!(eval(Operator::StartsWith, Some(json!("finance-eu")), json!("fin")));
			assert!(eval(Operator::EndsWith, Some(json!("finance-eu")), json!("-eu")));
			assert!(!eval(Operator::EndsWith, Some(json!("finance-eu")), json!("-EU")));
		}

		#[test]
		fn substring_tests_stringify_numbers() {
			assert!(eval(Operator::StartsWith, Some(json!(4021)), json!("40")));
		}

		#[test]
		fn contains_on_array_tests_membership() {
			assert!(eval(Operator::Contains, Some(json!(["admin", "hr"])), json!("hr")));
			assert!(!eval(Operator::Contains, Some(json!(["admin", "hr"])), json!("h")));
		}

		#[test]
		fn matches_uses_regex() {
			assert!(eval(Operator::Matches, Some(json!("INV-2024-001")), json!(r"^INV-\d{4}-\d{3}$")));
			assert!(!eval(Operator::Matches, Some(json!("PO-1")), json!(r"^INV-")));
		}

		#[test]
		fn invalid_pattern_is_an_error() {
			let mut patterns = PatternCache::new(1 << 20);
			let result = Operator::Matches.evaluate(Some(&json!("x")), &json!("(unclosed"), &mut patterns);
			assert!(result.is_err());
		}

		#[test]
		fn invalid_pattern_is_an_error_for_undefined_attributes() {
			let mut patterns = PatternCache::new(1 << 20);
			let result = Operator::Matches.evaluate(None, &json!("(["), &mut patterns);
			assert!(result.is_err());
		}

		#[test]
		fn invalid_pattern_is_an_error_for_non_scalar_attributes() {
			let mut patterns = PatternCache::new(1 << 20);
			let actual = json!(["a", "b"]);
			let result = Operator::Matches.evaluate(Some(&actual), &json!("(["), &mut patterns);
			assert!(result.is_err());
		}

		#[test]
		fn valid_pattern_on_undefined_attribute_is_false() {
			assert!(!eval(Operator::Matches, None, json!("^a")));
			assert!(!eval(Operator::Matches, Some(json!({"a": 1})), json!("a")));
		}

		#[test]
		fn oversized_pattern_is_an_error() {
			let mut patterns = PatternCache::new(16);
			let result = Operator::Matches.evaluate(Some(&json!("x")), &json!(r"\w{500}"), &mut patterns);
			assert!(result.is_err());
		}
	}
}
