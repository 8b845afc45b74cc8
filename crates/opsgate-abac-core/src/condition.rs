// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Condition trees and their JSON wire format.
//!
//! The visual policy builder emits untagged JSON:
//!
//! - leaf: `{"attribute": "user.department", "operator": "IN", "value": ["hr"]}`
//! - group: `{"AND": [...]}`, `{"OR": [...]}` or `{"NOT": {...}}`
//! - `{}` at the root: no conditions
//!
//! That shape is parsed exactly once, at ingestion, into [`ConditionNode`].
//! Evaluation only ever sees the tagged form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::operator::Operator;

/// A leaf comparison: `attribute operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
	/// Dot path such as `user.department` or `environment.hour`.
	pub attribute: String,
	pub operator: Operator,
	/// Literal operand or `{{path}}` template.
	pub value: Value,
}

impl Condition {
	pub fn new(attribute: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
		Self {
			attribute: attribute.into(),
			operator,
			value: value.into(),
		}
	}
}

/// A boolean combinator over child nodes.
///
/// `Not` holds exactly one child by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionGroup {
	And(Vec<ConditionNode>),
	Or(Vec<ConditionNode>),
	Not(Box<ConditionNode>),
}

impl ConditionGroup {
	pub fn keyword(&self) -> &'static str {
		match self {
			ConditionGroup::And(_) => "AND",
			ConditionGroup::Or(_) => "OR",
			ConditionGroup::Not(_) => "NOT",
		}
	}

	pub fn children(&self) -> &[ConditionNode] {
		match self {
			ConditionGroup::And(children) | ConditionGroup::Or(children) => children,
			ConditionGroup::Not(child) => std::slice::from_ref(child.as_ref()),
		}
	}
}

/// A node of a condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ConditionNode {
	Leaf(Condition),
	Group(ConditionGroup),
}

impl ConditionNode {
	pub fn leaf(attribute: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
		ConditionNode::Leaf(Condition::new(attribute, operator, value))
	}

	pub fn and(children: impl IntoIterator<Item = ConditionNode>) -> Self {
		ConditionNode::Group(ConditionGroup::And(children.into_iter().collect()))
	}

	pub fn or(children: impl IntoIterator<Item = ConditionNode>) -> Self {
		ConditionNode::Group(ConditionGroup::Or(children.into_iter().collect()))
	}

	#[allow(clippy::should_implement_trait)]
	pub fn not(child: ConditionNode) -> Self {
		ConditionNode::Group(ConditionGroup::Not(Box::new(child)))
	}

	/// Longest root-to-leaf path, counting both ends.
	pub fn depth(&self) -> usize {
		match self {
			ConditionNode::Leaf(_) => 1,
			ConditionNode::Group(group) => {
				1 + group.children().iter().map(Self::depth).max().unwrap_or(0)
			}
		}
	}

	/// Total number of groups and leaves.
	pub fn node_count(&self) -> usize {
		match self {
			ConditionNode::Leaf(_) => 1,
			ConditionNode::Group(group) => {
				1 + group.children().iter().map(Self::node_count).sum::<usize>()
			}
		}
	}

	/// Renders the builder wire format.
	pub fn to_wire(&self) -> Value {
		match self {
			ConditionNode::Leaf(condition) => {
				let mut map = Map::new();
				map.insert("attribute".into(), Value::String(condition.attribute.clone()));
				map.insert(
					"operator".into(),
					Value::String(condition.operator.as_str().to_string()),
				);
				map.insert("value".into(), condition.value.clone());
				Value::Object(map)
			}
			ConditionNode::Group(group) => {
				let body = match group {
					ConditionGroup::Not(child) => child.to_wire(),
					ConditionGroup::And(children) | ConditionGroup::Or(children) => {
						Value::Array(children.iter().map(Self::to_wire).collect())
					}
				};
				let mut map = Map::new();
				map.insert(group.keyword().into(), body);
				Value::Object(map)
			}
		}
	}
}

impl TryFrom<Value> for ConditionNode {
	type Error = ValidationError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		parse_node(value)
	}
}

impl From<ConditionNode> for Value {
	fn from(node: ConditionNode) -> Self {
		node.to_wire()
	}
}

/// Parses a root condition, where `{}` and `null` mean "no conditions".
pub fn parse_conditions(value: Value) -> Result<Option<ConditionNode>, ValidationError> {
	match &value {
		Value::Null => Ok(None),
		Value::Object(map) if map.is_empty() => Ok(None),
		_ => parse_node(value).map(Some),
	}
}

fn parse_node(value: Value) -> Result<ConditionNode, ValidationError> {
	let Value::Object(map) = value else {
		return Err(ValidationError::MalformedCondition(format!(
			"expected an object, found {}",
			kind_of(&value)
		)));
	};

	if map.contains_key("attribute") || map.contains_key("operator") {
		return parse_leaf(map);
	}

	if map.len() != 1 {
		let keys: Vec<&str> = map.keys().map(String::as_str).collect();
		return Err(ValidationError::MalformedCondition(format!(
			"a group needs exactly one of AND, OR, NOT; found keys {keys:?}"
		)));
	}

	let Some((keyword, body)) = map.into_iter().next() else {
		return Err(ValidationError::MalformedCondition("empty group".into()));
	};

	match keyword.as_str() {
		"AND" => Ok(ConditionNode::Group(ConditionGroup::And(parse_children(
			&keyword, body,
		)?))),
		"OR" => Ok(ConditionNode::Group(ConditionGroup::Or(parse_children(
			&keyword, body,
		)?))),
		"NOT" => parse_not(body),
		other => Err(ValidationError::MalformedCondition(format!(
			"unknown group operator '{other}'"
		))),
	}
}

fn parse_children(keyword: &str, body: Value) -> Result<Vec<ConditionNode>, ValidationError> {
	match body {
		Value::Array(items) => items.into_iter().map(parse_node).collect(),
		other => Err(ValidationError::MalformedCondition(format!(
			"{keyword} expects an array, found {}",
			kind_of(&other)
		))),
	}
}

fn parse_not(body: Value) -> Result<ConditionNode, ValidationError> {
	let child = match body {
		Value::Object(_) => parse_node(body)?,
		Value::Array(mut items) if items.len() == 1 => parse_node(items.remove(0))?,
		Value::Array(items) => return Err(ValidationError::NotArity(items.len())),
		other => {
			return Err(ValidationError::MalformedCondition(format!(
				"NOT expects a single condition, found {}",
				kind_of(&other)
			)))
		}
	};
	Ok(ConditionNode::not(child))
}

fn parse_leaf(mut map: Map<String, Value>) -> Result<ConditionNode, ValidationError> {
	let attribute = match map.remove("attribute") {
		Some(Value::String(s)) if !s.trim().is_empty() => s,
		_ => {
			return Err(ValidationError::MalformedCondition(
				"leaf needs a non-empty string 'attribute'".into(),
			))
		}
	};
	let operator = match map.remove("operator") {
		Some(Value::String(s)) => s.parse::<Operator>()?,
		_ => {
			return Err(ValidationError::MalformedCondition(format!(
				"leaf '{attribute}' needs a string 'operator'"
			)))
		}
	};
	let Some(value) = map.remove("value") else {
		return Err(ValidationError::MalformedCondition(format!(
			"leaf '{attribute}' needs a 'value'"
		)));
	};
	if let Some(extra) = map.keys().next() {
		return Err(ValidationError::MalformedCondition(format!(
			"unexpected key '{extra}' in leaf '{attribute}'"
		)));
	}

	Ok(ConditionNode::Leaf(Condition {
		attribute,
		operator,
		value,
	}))
}

fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

/// Serde adapter for an optional root condition that uses `{}` for "none".
pub mod optional_wire {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use serde_json::{Map, Value};

	use super::{parse_conditions, ConditionNode};

	pub fn serialize<S: Serializer>(
		node: &Option<ConditionNode>,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		match node {
			Some(node) => node.to_wire().serialize(serializer),
			None => Map::new().serialize(serializer),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Option<ConditionNode>, D::Error> {
		let value = Value::deserialize(deserializer)?;
		parse_conditions(value).map_err(serde::de::Error::custom)
	}
}
