// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// A policy that cannot be accepted at create/update time.
///
/// Validation errors never reach the evaluator: a policy that fails validation
/// cannot be activated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("invalid policy name '{0}': expected a lower-case slug of 2-100 characters")]
	InvalidName(String),

	#[error("policy display name must not be empty")]
	MissingDisplayName,

	#[error("policy must declare at least one resource pattern")]
	MissingResources,

	#[error("policy must declare at least one action pattern")]
	MissingActions,

	#[error("invalid resource pattern '{0}'")]
	InvalidResourcePattern(String),

	#[error("invalid action pattern '{0}'")]
	InvalidActionPattern(String),

	#[error("invalid subject matcher: {0}")]
	InvalidSubjectMatcher(String),

	#[error("malformed condition: {0}")]
	MalformedCondition(String),

	#[error("NOT group must have exactly one child, found {0}")]
	NotArity(usize),

	#[error("unknown operator '{0}'")]
	UnknownOperator(String),

	#[error("invalid attribute path '{0}'")]
	InvalidAttribute(String),

	#[error("operator {operator} on '{attribute}' requires {expected}")]
	InvalidOperand {
		attribute: String,
		operator: String,
		expected: &'static str,
	},

	#[error("invalid regex pattern '{pattern}': {message}")]
	InvalidPattern { pattern: String, message: String },

	#[error("condition tree depth {depth} exceeds limit {limit}")]
	TooDeep { depth: usize, limit: usize },

	#[error("condition tree has {nodes} nodes, limit is {limit}")]
	TooManyNodes { nodes: usize, limit: usize },
}

/// A failure while evaluating a single policy.
///
/// Contained at the policy boundary by the decision point: the offending policy
/// is excluded and the error text lands in the decision's `details.reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
	#[error("invalid MATCHES pattern '{pattern}' on '{attribute}': {message}")]
	InvalidPattern {
		attribute: String,
		pattern: String,
		message: String,
	},

	#[error("evaluation timeout")]
	Timeout,
}

pub type Result<T, E = ValidationError> = std::result::Result<T, E>;
