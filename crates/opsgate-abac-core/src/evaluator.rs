// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Recursive condition tree evaluation.
//!
//! AND short-circuits on the first `false`, OR on the first `true`, and NOT
//! negates its single child. An empty AND is vacuously true and an empty OR is
//! false. Leaves resolve their attribute and templated value, then defer to
//! the operator.

use std::time::Instant;

use tracing::trace;

use crate::condition::{Condition, ConditionGroup, ConditionNode};
use crate::error::EvaluationError;
use crate::operator::PatternCache;
use crate::resolver::{resolve, EvaluationContext};
use crate::template::resolve_template;
use crate::validation::DEFAULT_MAX_REGEX_SIZE;

/// Leaf counters aggregated into a decision's details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationStats {
	pub conditions_evaluated: u32,
	pub conditions_passed: u32,
}

/// Evaluates condition trees against one request.
///
/// Holds per-decision state: the leaf counters, the compiled pattern cache and
/// an optional deadline checked before every node.
#[derive(Debug)]
pub struct ConditionEvaluator<'a> {
	ctx: EvaluationContext<'a>,
	deadline: Option<Instant>,
	patterns: PatternCache,
	stats: EvaluationStats,
}

impl<'a> ConditionEvaluator<'a> {
	pub fn new(ctx: EvaluationContext<'a>) -> Self {
		Self {
			ctx,
			deadline: None,
			patterns: PatternCache::new(DEFAULT_MAX_REGEX_SIZE),
			stats: EvaluationStats::default(),
		}
	}

	/// Builder: abort with [`EvaluationError::Timeout`] once `deadline` passes.
	pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
		self.deadline = deadline;
		self
	}

	/// Builder: cap the compiled size of `MATCHES` patterns.
	pub fn with_max_regex_size(mut self, size_limit: usize) -> Self {
		self.patterns = PatternCache::new(size_limit);
		self
	}

	pub fn context(&self) -> &EvaluationContext<'a> {
		&self.ctx
	}

	pub fn stats(&self) -> EvaluationStats {
		self.stats
	}

	pub fn check_deadline(&self) -> Result<(), EvaluationError> {
		match self.deadline {
			Some(deadline) if Instant::now() >= deadline => Err(EvaluationError::Timeout),
			_ => Ok(()),
		}
	}

	/// Evaluates an optional tree. An absent tree is unconditionally satisfied.
	pub fn evaluate_optional(&mut self, node: Option<&ConditionNode>) -> Result<bool, EvaluationError> {
		match node {
			Some(node) => self.evaluate(node),
			None => Ok(true),
		}
	}

	pub fn evaluate(&mut self, node: &ConditionNode) -> Result<bool, EvaluationError> {
		self.check_deadline()?;
		match node {
			ConditionNode::Leaf(condition) => self.evaluate_leaf(condition),
			ConditionNode::Group(group) => self.evaluate_group(group),
		}
	}

	fn evaluate_group(&mut self, group: &ConditionGroup) -> Result<bool, EvaluationError> {
		match group {
			ConditionGroup::And(children) => {
				for child in children {
					if !self.evaluate(child)? {
						return Ok(false);
					}
				}
				Ok(true)
			}
			ConditionGroup::Or(children) => {
				for child in children {
					if self.evaluate(child)? {
						return Ok(true);
					}
				}
				Ok(false)
			}
			ConditionGroup::Not(child) => Ok(!self.evaluate(child)?),
		}
	}

	fn evaluate_leaf(&mut self, condition: &Condition) -> Result<bool, EvaluationError> {
		self.stats.conditions_evaluated += 1;

		let actual = resolve(&condition.attribute, &self.ctx);
		let passed = match resolve_template(&condition.value, &self.ctx) {
			// An unresolved templated operand fails every operator.
			None => false,
			Some(expected) => condition
				.operator
				.evaluate(actual.as_ref(), &expected, &mut self.patterns)
				.map_err(|e| EvaluationError::InvalidPattern {
					attribute: condition.attribute.clone(),
					pattern: expected.as_str().unwrap_or_default().to_string(),
					message: e.to_string(),
				})?,
		};

		if passed {
			self.stats.conditions_passed += 1;
		}
		trace!(
			attribute = %condition.attribute,
			operator = %condition.operator,
			passed,
			"Evaluated condition"
		);
		Ok(passed)
	}
}

/// Evaluates a tree with a fresh evaluator and no deadline.
pub fn evaluate(node: &ConditionNode, ctx: &EvaluationContext<'_>) -> Result<bool, EvaluationError> {
	ConditionEvaluator::new(*ctx).evaluate(node)
}
