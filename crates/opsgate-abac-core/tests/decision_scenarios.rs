// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end decisions built from the JSON the policy console sends.

use chrono::{TimeZone, Utc};
use opsgate_abac_core::{
	decide, decide_with, validate_policy, DecisionOptions, Effect, EngineLimits, EvaluationRequest,
	EvaluationResult, Policy, PolicyStatus, NO_MATCH_REASON,
};
use serde_json::{json, Value};

fn policy(value: Value) -> Policy {
	let mut policy: Policy = serde_json::from_value(value).unwrap();
	validate_policy(&policy, &EngineLimits::default()).unwrap();
	policy.status = PolicyStatus::Active;
	policy
}

fn request(value: Value) -> EvaluationRequest {
	serde_json::from_value(value).unwrap()
}

fn at_hour(hour: u32) -> DecisionOptions {
	DecisionOptions::default()
		.with_timeout(None)
		.with_now(Utc.with_ymd_and_hms(2024, 5, 15, hour, 0, 0).unwrap())
}

#[test]
fn unconditional_project_readers_allow() {
	let readers = policy(json!({
		"name": "project-readers",
		"display_name": "Project readers",
		"effect": "ALLOW",
		"priority": 100,
		"resources": ["project:*"],
		"actions": ["read"],
		"conditions": {}
	}));
	let result = decide(
		&[readers],
		&request(json!({
			"subject": {"id": "u-1", "type": "user", "attributes": {}},
			"action": "read",
			"resource": "project:42",
			"context": {}
		})),
	);
	assert_eq!(result.result, Effect::Allow);
	assert_eq!(result.matched_policies[0].name, "project-readers");
}

#[test]
fn deny_at_priority_ten_beats_allow_at_twenty() {
	let deny = policy(json!({
		"name": "freeze",
		"display_name": "Change freeze",
		"effect": "DENY",
		"priority": 10,
		"resources": ["*"],
		"actions": ["*"]
	}));
	let allow = policy(json!({
		"name": "editors",
		"display_name": "Editors",
		"effect": "ALLOW",
		"priority": 20,
		"resources": ["project:*"],
		"actions": ["update"]
	}));
	let result = decide(
		&[allow, deny],
		&request(json!({"subject": {"id": "u-1"}, "action": "update", "resource": "project:7"})),
	);
	assert_eq!(result.result, Effect::Deny);
	let names: Vec<_> = result.matched_policies.iter().map(|m| m.name.as_str()).collect();
	assert_eq!(names, ["freeze", "editors"]);
}

#[test]
fn no_match_is_default_deny() {
	let result = decide(
		&[policy(json!({
			"name": "payments",
			"display_name": "Payments",
			"effect": "ALLOW",
			"priority": 1,
			"resources": ["payment:*"],
			"actions": ["payment:approve"]
		}))],
		&request(json!({"subject": {"id": "u-1"}, "action": "approve", "resource": "payment:9"})),
	);
	assert_eq!(result.result, Effect::Deny);
	assert_eq!(result.details.reason, NO_MATCH_REASON);
}

#[test]
fn owner_template_compares_subject_to_resource() {
	let owners = policy(json!({
		"name": "owners-edit",
		"display_name": "Owners may edit",
		"effect": "ALLOW",
		"priority": 50,
		"resources": ["document"],
		"actions": ["edit"],
		"conditions": {"attribute": "user.id", "operator": "=", "value": "{{resource.owner_id}}"}
	}));
	let request_for = |owner: &str| {
		request(json!({
			"subject": {"id": "u-7"},
			"action": "edit",
			"resource": "document:3",
			"resource_attributes": {"owner_id": owner}
		}))
	};

	assert!(decide(std::slice::from_ref(&owners), &request_for("u-7")).is_allowed());
	assert!(!decide(std::slice::from_ref(&owners), &request_for("u-8")).is_allowed());
}

#[test]
fn business_hours_are_inclusive() {
	let business_hours = policy(json!({
		"name": "business-hours",
		"display_name": "Business hours only",
		"effect": "ALLOW",
		"priority": 10,
		"resources": ["*"],
		"actions": ["read"],
		"conditions": {"attribute": "environment.hour", "operator": "BETWEEN", "value": [9, 17]}
	}));
	let req = request(json!({"subject": {"id": "u-1"}, "action": "read", "resource": "report:q1"}));

	let decide_at = |hour| decide_with(std::slice::from_ref(&business_hours), &req, &at_hour(hour));
	assert!(decide_at(9).is_allowed());
	assert!(decide_at(17).is_allowed());
	assert!(!decide_at(8).is_allowed());
	assert!(!decide_at(18).is_allowed());
}

#[test]
fn department_membership_fails_closed() {
	let departments = policy(json!({
		"name": "hr-finance",
		"display_name": "HR and finance",
		"effect": "ALLOW",
		"priority": 10,
		"resources": ["employee:*"],
		"actions": ["read"],
		"conditions": {"AND": [
			{"attribute": "user.department", "operator": "IN", "value": ["hr", "finance"]}
		]}
	}));
	let decide_for = |attributes: Value| -> EvaluationResult {
		decide(
			std::slice::from_ref(&departments),
			&request(json!({
				"subject": {"id": "u-1", "attributes": attributes},
				"action": "read",
				"resource": "employee:5"
			})),
		)
	};

	assert!(decide_for(json!({"department": "hr"})).is_allowed());
	assert!(!decide_for(json!({"department": "engineering"})).is_allowed());

	let absent = decide_for(json!({}));
	assert!(!absent.is_allowed());
	assert_eq!(absent.details.reason, NO_MATCH_REASON);
}

#[test]
fn nested_groups_from_the_builder() {
	let approvers = policy(json!({
		"name": "invoice-approvers",
		"display_name": "Invoice approvers",
		"effect": "ALLOW",
		"priority": 30,
		"resources": ["invoice:*"],
		"actions": ["invoice:approve"],
		"conditions": {"OR": [
			{"attribute": "user.role", "operator": "=", "value": "cfo"},
			{"AND": [
				{"attribute": "user.roles", "operator": "CONTAINS", "value": "approver"},
				{"attribute": "resource.amount", "operator": "<=", "value": 10000},
				{"NOT": {"attribute": "resource.status", "operator": "IN", "value": ["paid", "void"]}}
			]}
		]}
	}));
	let decide_for = |role: &str, amount: i64, status: &str| {
		decide(
			std::slice::from_ref(&approvers),
			&request(json!({
				"subject": {"id": "u-1", "attributes": {"role": role, "roles": ["approver"]}},
				"action": "invoice:approve",
				"resource": "invoice:77",
				"resource_attributes": {"amount": amount, "status": status}
			})),
		)
		.is_allowed()
	};

	assert!(decide_for("clerk", 500, "pending"));
	assert!(!decide_for("clerk", 50_000, "pending"));
	assert!(!decide_for("clerk", 500, "paid"));
	assert!(decide_for("cfo", 50_000, "paid"));
}

#[test]
fn result_serializes_in_console_shape() {
	let readers = policy(json!({
		"name": "project-readers",
		"display_name": "Project readers",
		"effect": "ALLOW",
		"priority": 100,
		"resources": ["project:*"],
		"actions": ["read"]
	}));
	let result = decide(
		&[readers],
		&request(json!({"subject": {"id": "u-1"}, "action": "read", "resource": "project:1"})),
	);
	let json = serde_json::to_value(&result).unwrap();

	assert_eq!(json["result"], "ALLOW");
	assert_eq!(json["matched_policies"][0]["effect"], "ALLOW");
	assert_eq!(json["matched_policies"][0]["priority"], 100);
	assert!(json["evaluation_time_ms"].is_number());
	assert!(json["timestamp"].is_string());
	assert_eq!(json["details"]["conditions_evaluated"], 0);
	assert!(json["details"]["reason"].is_string());
}
