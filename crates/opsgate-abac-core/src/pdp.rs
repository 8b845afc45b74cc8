// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy decision point.
//!
//! [`decide`] runs every policy in a snapshot through the matcher, orders the
//! matches by priority and returns the effect of the first one
//! (first-applicable). With no match the answer is DENY.
//!
//! A policy whose conditions fail to evaluate is excluded and its error is
//! appended to `details.reason`; the remaining policies are unaffected. A
//! timeout or an internal fault aborts the whole decision with DENY.

use std::borrow::Borrow;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, instrument, warn};

use crate::error::EvaluationError;
use crate::evaluator::ConditionEvaluator;
use crate::matcher::match_policy;
use crate::resolver::EvaluationContext;
use crate::types::{
	Effect, EvaluationDetails, EvaluationRequest, EvaluationResult, MatchedPolicy, Policy,
};
use crate::validation::EngineLimits;

pub const NO_MATCH_REASON: &str = "no matching policy";
pub const TIMEOUT_REASON: &str = "evaluation timeout";
pub const INTERNAL_FAULT_REASON: &str = "internal evaluation fault";

/// Per-decision knobs.
#[derive(Debug, Clone, Copy)]
pub struct DecisionOptions {
	/// Clock used for `environment.*` defaults and the result timestamp.
	pub now: DateTime<Utc>,
	/// Wall-clock budget; `None` never times out.
	pub timeout: Option<Duration>,
	pub max_regex_size: usize,
}

impl DecisionOptions {
	pub fn from_limits(limits: &EngineLimits) -> Self {
		Self {
			now: Utc::now(),
			timeout: limits.evaluation_timeout,
			max_regex_size: limits.max_regex_size,
		}
	}

	/// Builder: pin the evaluation clock.
	pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
		self.now = now;
		self
	}

	/// Builder: set the wall-clock budget.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}
}

impl Default for DecisionOptions {
	fn default() -> Self {
		Self::from_limits(&EngineLimits::default())
	}
}

/// Decides a request against a policy snapshot with default options.
pub fn decide<P: Borrow<Policy>>(policies: &[P], request: &EvaluationRequest) -> EvaluationResult {
	decide_with(policies, request, &DecisionOptions::default())
}

/// Decides a request against a policy snapshot.
///
/// Never panics and never fails: every outcome is an [`EvaluationResult`].
#[instrument(
	level = "debug",
	skip(policies, request, options),
	fields(
		subject_id = %request.subject.id,
		action = %request.action,
		resource = %request.resource,
		policy_count = policies.len(),
	)
)]
pub fn decide_with<P: Borrow<Policy>>(
	policies: &[P],
	request: &EvaluationRequest,
	options: &DecisionOptions,
) -> EvaluationResult {
	let started = Instant::now();
	let deadline = options.timeout.and_then(|timeout| started.checked_add(timeout));

	let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
		run(policies, request, options, deadline)
	}));

	let mut result = match outcome {
		Ok(Ok(result)) => result,
		Ok(Err(err)) => {
			warn!(error = %err, "Decision aborted");
			EvaluationResult::deny(TIMEOUT_REASON)
		}
		Err(_) => {
			error!("Decision panicked, failing closed");
			EvaluationResult::deny(INTERNAL_FAULT_REASON)
		}
	};

	result.evaluation_time_ms = started.elapsed().as_secs_f64() * 1000.0;
	result.timestamp = options.now;

	debug!(
		result = %result.result,
		matched = result.matched_policies.len(),
		conditions_evaluated = result.details.conditions_evaluated,
		evaluation_time_ms = result.evaluation_time_ms,
		"Decision made"
	);
	result
}

/// The decision proper. Only a timeout escapes as an error.
fn run<P: Borrow<Policy>>(
	policies: &[P],
	request: &EvaluationRequest,
	options: &DecisionOptions,
	deadline: Option<Instant>,
) -> Result<EvaluationResult, EvaluationError> {
	let ctx = EvaluationContext::new(request, options.now);
	let mut evaluator = ConditionEvaluator::new(ctx)
		.with_deadline(deadline)
		.with_max_regex_size(options.max_regex_size);

	let mut matched: Vec<&Policy> = Vec::new();
	let mut exclusions: Vec<String> = Vec::new();

	for policy in policies {
		// Unconditional policies never reach the per-node check.
		evaluator.check_deadline()?;
		let policy: &Policy = policy.borrow();
		match match_policy(policy, &mut evaluator) {
			Ok(true) => matched.push(policy),
			Ok(false) => {}
			Err(EvaluationError::Timeout) => return Err(EvaluationError::Timeout),
			Err(err) => {
				warn!(
					policy_id = %policy.id,
					policy_name = %policy.name,
					error = %err,
					"Policy excluded from decision"
				);
				exclusions.push(format!("policy '{}' excluded: {err}", policy.name));
			}
		}
	}

	// Stable: equal (priority, created_at) keeps snapshot order.
	matched.sort_by(|a, b| {
		a.priority
			.cmp(&b.priority)
			.then_with(|| a.created_at.cmp(&b.created_at))
	});

	let (effect, headline) = match matched.first() {
		Some(winner) => (
			winner.effect,
			format!(
				"policy '{}' matched with {} at priority {}",
				winner.name, winner.effect, winner.priority
			),
		),
		None => (Effect::Deny, NO_MATCH_REASON.to_string()),
	};
	let reason = std::iter::once(headline)
		.chain(exclusions)
		.collect::<Vec<_>>()
		.join("; ");

	let stats = evaluator.stats();
	Ok(EvaluationResult {
		result: effect,
		matched_policies: matched.into_iter().map(MatchedPolicy::from).collect(),
		evaluation_time_ms: 0.0,
		timestamp: options.now,
		details: EvaluationDetails {
			conditions_evaluated: stats.conditions_evaluated,
			conditions_passed: stats.conditions_passed,
			reason,
		},
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::condition::ConditionNode;
	use crate::operator::Operator;
	use crate::types::{PolicyStatus, Subject, TenantId};
	use chrono::TimeZone;
	use serde_json::json;

	fn policy(name: &str, effect: Effect, priority: i32) -> Policy {
		Policy::new(name, effect, priority)
			.with_resources(["project:*"])
			.with_actions(["read"])
			.with_status(PolicyStatus::Active)
	}

	fn request() -> EvaluationRequest {
		EvaluationRequest::new(
			Subject::new("u-1").with_attribute("department", "hr"),
			"read",
			"project:42",
		)
	}

	mod precedence {
		use super::*;

		#[test]
		fn lower_priority_number_wins() {
			let policies = vec![
				policy("allow-20", Effect::Allow, 20),
				policy("deny-10", Effect::Deny, 10),
			];
			let result = decide(&policies, &request());
			assert_eq!(result.result, Effect::Deny);
			let names: Vec<_> = result.matched_policies.iter().map(|m| m.name.as_str()).collect();
			assert_eq!(names, ["deny-10", "allow-20"]);
		}

		#[test]
		fn allow_wins_when_it_has_precedence() {
			let policies = vec![
				policy("deny-20", Effect::Deny, 20),
				policy("allow-10", Effect::Allow, 10),
				policy("allow-30", Effect::Allow, 30),
			];
			let result = decide(&policies, &request());
			assert!(result.is_allowed());
			assert_eq!(result.matched_policies.len(), 3);
		}

		#[test]
		fn ties_break_by_creation_order() {
			let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
			let later = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
			let policies = vec![
				policy("newer-allow", Effect::Allow, 10).with_created_at(later),
				policy("older-deny", Effect::Deny, 10).with_created_at(earlier),
			];
			let result = decide(&policies, &request());
			assert_eq!(result.result, Effect::Deny);
			assert_eq!(result.matched_policies[0].name, "older-deny");
		}
	}

	mod default_deny {
		use super::*;

		#[test]
		fn empty_snapshot_denies() {
			let result = decide::<Policy>(&[], &request());
			assert_eq!(result.result, Effect::Deny);
			assert_eq!(result.details.reason, NO_MATCH_REASON);
			assert!(result.matched_policies.is_empty());
		}

		#[test]
		fn non_matching_policies_deny() {
			let policies = vec![policy("writers", Effect::Allow, 1).with_actions(["write"])];
			let result = decide(&policies, &request());
			assert_eq!(result.details.reason, NO_MATCH_REASON);
		}

		#[test]
		fn other_tenants_are_out_of_scope() {
			let policies = vec![policy("tenant-only", Effect::Allow, 1).with_tenant(TenantId::new())];
			assert!(!decide(&policies, &request()).is_allowed());
		}
	}

	mod errors {
		use super::*;

		#[test]
		fn bad_regex_excludes_only_that_policy() {
			let broken = policy("broken", Effect::Deny, 1).with_conditions(ConditionNode::leaf(
				"user.department",
				Operator::Matches,
				"([",
			));
			let policies = vec![broken, policy("readers", Effect::Allow, 50)];
			let result = decide(&policies, &request());

			assert!(result.is_allowed());
			assert_eq!(result.matched_policies.len(), 1);
			assert_eq!(result.matched_policies[0].name, "readers");
			assert!(result.details.reason.contains("policy 'broken' excluded"));
		}

		#[test]
		fn bad_regex_on_missing_attribute_is_recorded() {
			let broken = policy("broken", Effect::Allow, 1).with_conditions(ConditionNode::leaf(
				"user.email",
				Operator::Matches,
				"([",
			));
			let result = decide(&[broken], &request());

			assert_eq!(result.result, Effect::Deny);
			assert!(result.matched_policies.is_empty());
			assert!(result.details.reason.starts_with(NO_MATCH_REASON));
			assert!(result.details.reason.contains("policy 'broken' excluded"));
		}

		#[test]
		fn zero_budget_times_out() {
			let policies = vec![policy("readers", Effect::Allow, 50)];
			let options = DecisionOptions::default().with_timeout(Some(Duration::ZERO));
			let result = decide_with(&policies, &request(), &options);
			assert_eq!(result.result, Effect::Deny);
			assert_eq!(result.details.reason, TIMEOUT_REASON);
			assert!(result.matched_policies.is_empty());
		}

		#[test]
		fn unconditional_policies_honour_the_budget() {
			let policies: Vec<Policy> = (0..64)
				.map(|i| policy(&format!("readers-{i}"), Effect::Allow, i))
				.collect();
			assert!(policies.iter().all(|p| p.conditions.is_none() && p.subjects.is_empty()));

			let options = DecisionOptions::default().with_timeout(Some(Duration::ZERO));
			let result = decide_with(&policies, &request(), &options);
			assert_eq!(result.result, Effect::Deny);
			assert_eq!(result.details.reason, TIMEOUT_REASON);
			assert_eq!(result.details.conditions_evaluated, 0);
		}

		#[test]
		fn empty_snapshot_needs_no_budget() {
			let options = DecisionOptions::default().with_timeout(Some(Duration::ZERO));
			let result = decide_with::<Policy>(&[], &request(), &options);
			assert_eq!(result.details.reason, NO_MATCH_REASON);
		}
	}

	mod audit {
		use super::*;

		#[test]
		fn counts_leaf_evaluations() {
			let conditional = policy("hr-only", Effect::Allow, 10).with_conditions(ConditionNode::and([
				ConditionNode::leaf("user.department", Operator::In, json!(["hr", "finance"])),
				ConditionNode::leaf("user.level", Operator::GreaterThan, 5),
			]));
			let result = decide(&[conditional], &request());
			assert_eq!(result.result, Effect::Deny);
			assert_eq!(result.details.conditions_evaluated, 2);
			assert_eq!(result.details.conditions_passed, 1);
		}

		#[test]
		fn timestamp_is_the_pinned_clock() {
			let now = Utc.with_ymd_and_hms(2024, 5, 15, 9, 0, 0).unwrap();
			let options = DecisionOptions::default().with_now(now);
			let result = decide_with(&[policy("readers", Effect::Allow, 1)], &request(), &options);
			assert_eq!(result.timestamp, now);
			assert!(result.evaluation_time_ms >= 0.0);
		}

		#[test]
		fn accepts_borrowed_snapshots() {
			let owned = policy("readers", Effect::Allow, 1);
			let snapshot: Vec<&Policy> = vec![&owned];
			assert!(decide(&snapshot, &request()).is_allowed());
		}
	}
}
