// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Create/update-time policy validation.
//!
//! Everything the evaluator can check statically is checked here, so a policy
//! that reaches `active` is structurally sound and bounded in cost.

use std::time::Duration;

use serde_json::Value;

use crate::condition::{Condition, ConditionNode};
use crate::error::{Result, ValidationError};
use crate::operator::{compile_pattern, Operator};
use crate::resolver::ATTRIBUTE_ROOTS;
use crate::template::is_template;
use crate::types::{Policy, SubjectMatcher};
use crate::value::is_scalar;

pub const DEFAULT_MAX_CONDITION_DEPTH: usize = 16;
pub const DEFAULT_MAX_CONDITION_NODES: usize = 256;
pub const DEFAULT_MAX_REGEX_SIZE: usize = 1 << 20;
pub const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::from_millis(250);

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 100;

/// Bounds on policy shape and evaluation cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
	pub max_condition_depth: usize,
	pub max_condition_nodes: usize,
	pub max_regex_size: usize,
	/// `None` disables the per-decision deadline.
	pub evaluation_timeout: Option<Duration>,
}

impl Default for EngineLimits {
	fn default() -> Self {
		Self {
			max_condition_depth: DEFAULT_MAX_CONDITION_DEPTH,
			max_condition_nodes: DEFAULT_MAX_CONDITION_NODES,
			max_regex_size: DEFAULT_MAX_REGEX_SIZE,
			evaluation_timeout: Some(DEFAULT_EVALUATION_TIMEOUT),
		}
	}
}

/// Validates a whole policy, returning the first problem found.
pub fn validate_policy(policy: &Policy, limits: &EngineLimits) -> Result<()> {
	validate_name(&policy.name)?;
	if policy.display_name.trim().is_empty() {
		return Err(ValidationError::MissingDisplayName);
	}

	if policy.resources.is_empty() {
		return Err(ValidationError::MissingResources);
	}
	for pattern in &policy.resources {
		validate_resource_pattern(pattern)?;
	}

	if policy.actions.is_empty() {
		return Err(ValidationError::MissingActions);
	}
	for pattern in &policy.actions {
		validate_action_pattern(pattern)?;
	}

	for matcher in &policy.subjects {
		validate_subject_matcher(matcher, limits)?;
	}

	if let Some(conditions) = &policy.conditions {
		validate_condition_tree(conditions, limits)?;
	}
	Ok(())
}

/// Lower-case slug: ASCII letters, digits, `-` and `_`, starting alphanumeric.
pub fn validate_name(name: &str) -> Result<()> {
	let valid_len = (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name.len());
	let valid_start = name
		.chars()
		.next()
		.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
	let valid_chars = name
		.chars()
		.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

	if valid_len && valid_start && valid_chars {
		Ok(())
	} else {
		Err(ValidationError::InvalidName(name.to_string()))
	}
}

pub fn validate_resource_pattern(pattern: &str) -> Result<()> {
	if is_valid_pattern(pattern) {
		Ok(())
	} else {
		Err(ValidationError::InvalidResourcePattern(pattern.to_string()))
	}
}

pub fn validate_action_pattern(pattern: &str) -> Result<()> {
	if is_valid_pattern(pattern) {
		Ok(())
	} else {
		Err(ValidationError::InvalidActionPattern(pattern.to_string()))
	}
}

/// `*`, `name`, `type:*` or `type:name`.
fn is_valid_pattern(pattern: &str) -> bool {
	if pattern == "*" {
		return true;
	}
	if pattern.is_empty() || pattern.chars().any(char::is_whitespace) {
		return false;
	}

	let segments: Vec<&str> = pattern.split(':').collect();
	let valid_segment = |s: &&str| !s.is_empty() && (*s == "*" || !s.contains('*'));
	match segments.as_slice() {
		[single] => *single != "*" && valid_segment(single),
		[head, tail] => *head != "*" && valid_segment(head) && valid_segment(tail),
		_ => false,
	}
}

pub fn validate_subject_matcher(matcher: &SubjectMatcher, limits: &EngineLimits) -> Result<()> {
	match matcher {
		SubjectMatcher::Id { id } if id.trim().is_empty() => Err(
			ValidationError::InvalidSubjectMatcher("subject id must not be empty".to_string()),
		),
		SubjectMatcher::Type { subject_type } if subject_type.trim().is_empty() => {
			Err(ValidationError::InvalidSubjectMatcher(
				"subject type must not be empty".to_string(),
			))
		}
		SubjectMatcher::Attribute { condition } => validate_condition_tree(condition, limits),
		_ => Ok(()),
	}
}

/// Checks tree bounds, then every leaf.
pub fn validate_condition_tree(node: &ConditionNode, limits: &EngineLimits) -> Result<()> {
	let depth = node.depth();
	if depth > limits.max_condition_depth {
		return Err(ValidationError::TooDeep {
			depth,
			limit: limits.max_condition_depth,
		});
	}
	let nodes = node.node_count();
	if nodes > limits.max_condition_nodes {
		return Err(ValidationError::TooManyNodes {
			nodes,
			limit: limits.max_condition_nodes,
		});
	}
	validate_leaves(node, limits)
}

fn validate_leaves(node: &ConditionNode, limits: &EngineLimits) -> Result<()> {
	match node {
		ConditionNode::Leaf(condition) => validate_condition(condition, limits),
		ConditionNode::Group(group) => group
			.children()
			.iter()
			.try_for_each(|child| validate_leaves(child, limits)),
	}
}

fn validate_condition(condition: &Condition, limits: &EngineLimits) -> Result<()> {
	validate_attribute(&condition.attribute)?;

	let value = &condition.value;
	// Templated operands are only known at evaluation time.
	if value.as_str().is_some_and(is_template) {
		return Ok(());
	}

	let invalid = |expected: &'static str| ValidationError::InvalidOperand {
		attribute: condition.attribute.clone(),
		operator: condition.operator.as_str().to_string(),
		expected,
	};

	match condition.operator {
		Operator::Equals | Operator::NotEquals => Ok(()),
		Operator::GreaterThan
		| Operator::LessThan
		| Operator::GreaterThanOrEquals
		| Operator::LessThanOrEquals => match value {
			Value::Number(_) | Value::String(_) => Ok(()),
			_ => Err(invalid("a number, date or template")),
		},
		Operator::In | Operator::NotIn => match value {
			Value::Array(_) => Ok(()),
			_ => Err(invalid("an array or template")),
		},
		Operator::Between => match value.as_array().map(Vec::as_slice) {
			Some([low, high]) if is_scalar(low) && is_scalar(high) => Ok(()),
			_ => Err(invalid("a two-element [low, high] array")),
		},
		Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
			if is_scalar(value) {
				Ok(())
			} else {
				Err(invalid("a string, number or template"))
			}
		}
		Operator::Matches => {
			let pattern = value.as_str().ok_or_else(|| invalid("a regex string"))?;
			compile_pattern(pattern, limits.max_regex_size)
				.map(|_| ())
				.map_err(|e| ValidationError::InvalidPattern {
					pattern: pattern.to_string(),
					message: e.to_string(),
				})
		}
	}
}

/// `root.path` with a known root and no empty segments.
pub fn validate_attribute(attribute: &str) -> Result<()> {
	let valid = match attribute.split_once('.') {
		Some((root, rest)) => {
			ATTRIBUTE_ROOTS.contains(&root) && rest.split('.').all(|segment| !segment.is_empty())
		}
		None => false,
	};
	if valid {
		Ok(())
	} else {
		Err(ValidationError::InvalidAttribute(attribute.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Effect;
	use proptest::prelude::*;
	use serde_json::json;

	fn valid_policy() -> Policy {
		Policy::new("project-readers", Effect::Allow, 100)
			.with_resources(["project:*"])
			.with_actions(["read"])
	}

	fn check(policy: &Policy) -> Result<()> {
		validate_policy(policy, &EngineLimits::default())
	}

	fn nested_not(depth: usize) -> ConditionNode {
		let mut node = ConditionNode::leaf("user.id", Operator::Equals, "u");
		for _ in 1..depth {
			node = ConditionNode::not(node);
		}
		node
	}

	mod names {
		use super::*;

		#[test]
		fn accepts_slugs() {
			assert!(validate_name("project-readers").is_ok());
			assert!(validate_name("p2").is_ok());
			assert!(validate_name("finance_approvers_eu").is_ok());
		}

		#[test]
		fn rejects_non_slugs() {
			let too_long = "x".repeat(101);
			for name in ["", "p", "Project", "-lead", "has space", "a.b", too_long.as_str()] {
				assert!(validate_name(name).is_err(), "{name}");
			}
		}
	}

	mod patterns {
		use super::*;

		#[test]
		fn accepts_supported_shapes() {
			for p in ["*", "project", "project:*", "project:42", "payment:approve"] {
				assert!(validate_resource_pattern(p).is_ok(), "{p}");
				assert!(validate_action_pattern(p).is_ok(), "{p}");
			}
		}

		#[test]
		fn rejects_malformed_patterns() {
			for p in ["", " ", "project:", ":42", "*:42", "pro*", "a:b:c", "project :1"] {
				assert!(validate_resource_pattern(p).is_err(), "{p:?}");
			}
		}
	}

	mod policies {
		use super::*;

		#[test]
		fn accepts_minimal_policy() {
			assert!(check(&valid_policy()).is_ok());
		}

		#[test]
		fn requires_resources_and_actions() {
			let no_resources = valid_policy().with_resources(Vec::<String>::new());
			assert_eq!(check(&no_resources), Err(ValidationError::MissingResources));

			let no_actions = valid_policy().with_actions(Vec::<String>::new());
			assert_eq!(check(&no_actions), Err(ValidationError::MissingActions));
		}

		#[test]
		fn requires_display_name() {
			let mut policy = valid_policy();
			policy.display_name = "  ".into();
			assert_eq!(check(&policy), Err(ValidationError::MissingDisplayName));
		}

		#[test]
		fn checks_subject_matchers() {
			let policy = valid_policy().with_subject(SubjectMatcher::Id { id: String::new() });
			assert!(matches!(check(&policy), Err(ValidationError::InvalidSubjectMatcher(_))));

			let policy = valid_policy().with_subject(SubjectMatcher::Attribute {
				condition: ConditionNode::leaf("tenant.plan", Operator::Equals, "pro"),
			});
			assert!(matches!(check(&policy), Err(ValidationError::InvalidAttribute(_))));
		}
	}

	mod conditions {
		use super::*;

		fn leaf(attribute: &str, op: Operator, value: Value) -> Result<()> {
			validate_condition_tree(&ConditionNode::leaf(attribute, op, value), &EngineLimits::default())
		}

		#[test]
		fn rejects_unknown_roots() {
			assert!(matches!(
				leaf("tenant.id", Operator::Equals, json!("x")),
				Err(ValidationError::InvalidAttribute(_))
			));
			assert!(leaf("user.", Operator::Equals, json!("x")).is_err());
			assert!(leaf("user", Operator::Equals, json!("x")).is_err());
		}

		#[test]
		fn checks_operand_shapes() {
			assert!(leaf("user.department", Operator::In, json!(["hr"])).is_ok());
			assert!(leaf("user.department", Operator::In, json!("hr")).is_err());
			assert!(leaf("environment.hour", Operator::Between, json!([9, 17])).is_ok());
			assert!(leaf("environment.hour", Operator::Between, json!([9])).is_err());
			assert!(leaf("user.level", Operator::GreaterThan, json!([1])).is_err());
			assert!(leaf("user.name", Operator::Contains, json!({"a": 1})).is_err());
		}

		#[test]
		fn templates_defer_checks() {
			assert!(leaf("user.department", Operator::In, json!("{{resource.departments}}")).is_ok());
		}

		#[test]
		fn regex_must_compile() {
			assert!(leaf("user.email", Operator::Matches, json!(r"@example\.com$")).is_ok());
			assert!(matches!(
				leaf("user.email", Operator::Matches, json!("([")),
				Err(ValidationError::InvalidPattern { .. })
			));
			assert!(leaf("user.email", Operator::Matches, json!(5)).is_err());
		}

		#[test]
		fn enforces_depth_limit() {
			let limits = EngineLimits::default();
			assert!(validate_condition_tree(&nested_not(limits.max_condition_depth), &limits).is_ok());
			assert_eq!(
				validate_condition_tree(&nested_not(limits.max_condition_depth + 1), &limits),
				Err(ValidationError::TooDeep {
					depth: limits.max_condition_depth + 1,
					limit: limits.max_condition_depth
				})
			);
		}

		#[test]
		fn enforces_node_limit() {
			let limits = EngineLimits {
				max_condition_nodes: 3,
				..EngineLimits::default()
			};
			let leaf = ConditionNode::leaf("user.id", Operator::Equals, "u");
			let tree = ConditionNode::and([leaf.clone(), leaf.clone(), leaf]);
			assert_eq!(
				validate_condition_tree(&tree, &limits),
				Err(ValidationError::TooManyNodes { nodes: 4, limit: 3 })
			);
		}
	}

	proptest! {
		#[test]
		fn generated_slugs_are_valid(name in "[a-z0-9][a-z0-9_-]{1,99}") {
			prop_assert!(validate_name(&name).is_ok());
		}

		#[test]
		fn names_with_uppercase_are_rejected(prefix in "[a-z]{1,10}", upper in "[A-Z]", suffix in "[a-z]{0,10}") {
			let name = format!("{prefix}{upper}{suffix}");
			prop_assert!(validate_name(&name).is_err());
		}
	}
}
