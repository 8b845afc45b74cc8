// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy applicability: scope, resource, action, subject, then conditions.

use chrono::Utc;

use crate::error::EvaluationError;
use crate::evaluator::ConditionEvaluator;
use crate::resolver::EvaluationContext;
use crate::types::{EvaluationRequest, Policy, SubjectMatcher, TenantId};

pub const WILDCARD: &str = "*";

/// Matches a request resource against one pattern.
///
/// `*` matches anything, `type:*` any id under `type`, `type:id` exactly, and
/// a bare `type` compares against the request's type prefix.
pub fn resource_matches(pattern: &str, resource: &str) -> bool {
	if pattern == WILDCARD {
		return true;
	}
	match pattern.split_once(':') {
		Some((pattern_type, WILDCARD)) => resource
			.split_once(':')
			.is_some_and(|(resource_type, _)| resource_type == pattern_type),
		Some(_) => pattern == resource,
		None => resource_type(resource) == pattern,
	}
}

/// Matches a request action against one pattern.
///
/// Literal or wildcard only: `payment:approve` and `approve` are distinct
/// actions. `payment:*` covers every action in the `payment` namespace.
pub fn action_matches(pattern: &str, action: &str) -> bool {
	if pattern == WILDCARD {
		return true;
	}
	match pattern.split_once(':') {
		Some((namespace, WILDCARD)) => action
			.split_once(':')
			.is_some_and(|(action_namespace, _)| action_namespace == namespace),
		_ => pattern == action,
	}
}

/// A policy is in scope when it is global or belongs to the request's tenant.
pub fn in_scope(policy_tenant: Option<TenantId>, request_tenant: Option<TenantId>) -> bool {
	match policy_tenant {
		None => true,
		Some(tenant) => request_tenant == Some(tenant),
	}
}

fn resource_type(resource: &str) -> &str {
	resource.split_once(':').map_or(resource, |(t, _)| t)
}

fn subject_matches(
	matcher: &SubjectMatcher,
	evaluator: &mut ConditionEvaluator<'_>,
) -> Result<bool, EvaluationError> {
	let request = evaluator.context().request;
	let subject = &request.subject;
	match matcher {
		SubjectMatcher::Id { id } => Ok(subject.id == *id),
		SubjectMatcher::Type { subject_type } => Ok(subject.subject_type == *subject_type),
		SubjectMatcher::Attribute { condition } => evaluator.evaluate(condition),
	}
}

/// Full applicability check.
///
/// Cheap structural tests run first so conditions are only evaluated for
/// policies that could apply.
pub fn match_policy(
	policy: &Policy,
	evaluator: &mut ConditionEvaluator<'_>,
) -> Result<bool, EvaluationError> {
	let request = evaluator.context().request;

	if !policy.is_active() || !in_scope(policy.tenant_id, request.tenant_id) {
		return Ok(false);
	}
	if !policy.resources.iter().any(|p| resource_matches(p, &request.resource)) {
		return Ok(false);
	}
	if !policy.actions.iter().any(|p| action_matches(p, &request.action)) {
		return Ok(false);
	}

	if !policy.subjects.is_empty() {
		let mut any = false;
		for matcher in &policy.subjects {
			if subject_matches(matcher, evaluator)? {
				any = true;
				break;
			}
		}
		if !any {
			return Ok(false);
		}
	}

	evaluator.evaluate_optional(policy.conditions.as_ref())
}

/// Convenience wrapper: evaluation errors count as "does not match".
pub fn matches(policy: &Policy, request: &EvaluationRequest) -> bool {
	let mut evaluator = ConditionEvaluator::new(EvaluationContext::new(request, Utc::now()));
	match_policy(policy, &mut evaluator).unwrap_or(false)
}
