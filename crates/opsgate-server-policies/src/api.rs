// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and response bodies of the policy administration surface.

use chrono::{DateTime, Utc};
use opsgate_abac_core::{
	Effect, EvaluationResult, Policy, PolicyStatus, SubjectMatcher, TenantId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Policy Types
// ============================================================================

/// A policy in API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResponse {
	pub id: String,
	pub name: String,
	pub display_name: String,
	pub description: Option<String>,
	pub effect: Effect,
	pub priority: i32,
	pub status: PolicyStatus,
	/// `None` for global policies.
	pub tenant_id: Option<String>,
	pub resources: Vec<String>,
	pub actions: Vec<String>,
	pub subjects: Vec<SubjectMatcher>,
	/// Condition tree in builder wire format; `{}` when unconditional.
	pub conditions: Value,
	pub version: u64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub created_by: Option<String>,
	pub updated_by: Option<String>,
}

impl From<&Policy> for PolicyResponse {
	fn from(policy: &Policy) -> Self {
		Self {
			id: policy.id.to_string(),
			name: policy.name.clone(),
			display_name: policy.display_name.clone(),
			description: policy.description.clone(),
			effect: policy.effect,
			priority: policy.priority,
			status: policy.status,
			tenant_id: policy.tenant_id.map(|t| t.to_string()),
			resources: policy.resources.clone(),
			actions: policy.actions.clone(),
			subjects: policy.subjects.clone(),
			conditions: policy
				.conditions
				.as_ref()
				.map_or_else(|| Value::Object(Default::default()), |c| c.to_wire()),
			version: policy.version,
			created_at: policy.created_at,
			updated_at: policy.updated_at,
			created_by: policy.created_by.clone(),
			updated_by: policy.updated_by.clone(),
		}
	}
}

/// Request to create a policy. New policies start as drafts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePolicyRequest {
	/// Unique slug (lower-case letters, digits, `-`, `_`; 2-100 chars).
	pub name: String,
	pub display_name: String,
	#[serde(default)]
	pub description: Option<String>,
	pub effect: Effect,
	pub priority: i32,
	#[serde(default)]
	pub tenant_id: Option<TenantId>,
	pub resources: Vec<String>,
	pub actions: Vec<String>,
	#[serde(default)]
	pub subjects: Vec<SubjectMatcher>,
	/// Builder wire format. Parsed and validated by the service.
	#[serde(default)]
	pub conditions: Value,
}

/// Request to update a draft or inactive policy. Absent fields are unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePolicyRequest {
	pub name: Option<String>,
	pub display_name: Option<String>,
	pub description: Option<String>,
	pub effect: Option<Effect>,
	pub priority: Option<i32>,
	pub resources: Option<Vec<String>>,
	pub actions: Option<Vec<String>>,
	pub subjects: Option<Vec<SubjectMatcher>>,
	/// `{}` clears the conditions.
	pub conditions: Option<Value>,
}

/// Filters for listing policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPoliciesQuery {
	/// Restrict to one tenant's policies (global policies are always included).
	pub tenant_id: Option<TenantId>,
	pub status: Option<PolicyStatus>,
}

/// Response for listing policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPoliciesResponse {
	pub policies: Vec<PolicyResponse>,
	pub total: usize,
}

impl ListPoliciesResponse {
	pub fn from_policies<'a>(policies: impl IntoIterator<Item = &'a Policy>) -> Self {
		let policies: Vec<PolicyResponse> = policies.into_iter().map(PolicyResponse::from).collect();
		Self {
			total: policies.len(),
			policies,
		}
	}
}

/// Body of `POST /policies/{id}/test`: exactly the decision.
pub type TestPolicyResponse = EvaluationResult;
