// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy administration and decision entry points.
//!
//! Lifecycle:
//!
//! ```text
//! create ─▶ draft ⇄ (update) ─activate─▶ active ─deactivate─▶ inactive ─activate─▶ active
//!             └──────────── archive (from any status but archived) ───────────▶ archived
//! ```
//!
//! Only draft and inactive policies may be edited, and every edit bumps the
//! policy version. Status changes keep the version.

use chrono::Utc;
use opsgate_abac_core::{
	decide_with, parse_conditions, validate_policy, DecisionOptions, EngineLimits,
	EvaluationRequest, EvaluationResult, Policy, PolicyId, PolicyStatus,
};
use opsgate_server_config::EngineConfig;
use tracing::{info, instrument};

use crate::api::{CreatePolicyRequest, ListPoliciesQuery, UpdatePolicyRequest};
use crate::error::{PolicyServiceError, Result};
use crate::store::{PolicySnapshot, PolicyStore};

#[derive(Debug, Default)]
pub struct PolicyService {
	store: PolicyStore,
	limits: EngineLimits,
}

impl PolicyService {
	pub fn new(limits: EngineLimits) -> Self {
		Self {
			store: PolicyStore::new(),
			limits,
		}
	}

	pub fn from_config(config: &EngineConfig) -> Self {
		Self::new(config.limits())
	}

	pub fn limits(&self) -> &EngineLimits {
		&self.limits
	}

	pub fn snapshot(&self) -> std::sync::Arc<PolicySnapshot> {
		self.store.snapshot()
	}

	#[instrument(skip(self, request, actor), fields(name = %request.name))]
	pub fn create_policy(&self, request: CreatePolicyRequest, actor: Option<&str>) -> Result<Policy> {
		let conditions = parse_conditions(request.conditions)?;
		let now = Utc::now();
		let policy = Policy {
			name: request.name,
			display_name: request.display_name,
			description: request.description,
			tenant_id: request.tenant_id,
			resources: request.resources,
			actions: request.actions,
			subjects: request.subjects,
			conditions,
			created_by: actor.map(str::to_string),
			updated_by: actor.map(str::to_string),
			..Policy::new("", request.effect, request.priority).with_created_at(now)
		};
		validate_policy(&policy, &self.limits)?;

		let created = self.store.update(|policies| -> Result<_> {
			ensure_unique_name(policies, &policy.name, None)?;
			policies.push(policy.clone());
			Ok(policy)
		})?;

		info!(policy_id = %created.id, name = %created.name, version = created.version, "Policy created");
		Ok(created)
	}

	/// Loads policies as-is, keeping their ids, status and versions.
	///
	/// Every policy is validated, and ids and names must be unique across the
	/// store. A rejected batch leaves the store untouched.
	#[instrument(skip(self, policies), fields(count = policies.len()))]
	pub fn import_policies(&self, policies: Vec<Policy>) -> Result<usize> {
		for policy in &policies {
			validate_policy(policy, &self.limits)?;
		}

		let count = self.store.update(|existing| -> Result<_> {
			for policy in policies {
				if existing.iter().any(|p| p.id == policy.id) {
					return Err(PolicyServiceError::DuplicateId(policy.id));
				}
				ensure_unique_name(existing, &policy.name, None)?;
				existing.push(policy);
			}
			Ok(existing.len())
		})?;

		info!(total = count, "Policies imported");
		Ok(count)
	}

	#[instrument(skip(self, request, actor), fields(policy_id = %id))]
	pub fn update_policy(
		&self,
		id: PolicyId,
		request: UpdatePolicyRequest,
		actor: Option<&str>,
	) -> Result<Policy> {
		let conditions = request.conditions.map(parse_conditions).transpose()?;

		let updated = self.store.update(|policies| -> Result<_> {
			let index = position(policies, id)?;
			let current = &policies[index];
			if !current.status.is_editable() {
				return Err(PolicyServiceError::NotEditable {
					id,
					status: current.status,
				});
			}

			let mut next = current.clone();
			if let Some(name) = request.name {
				ensure_unique_name(policies, &name, Some(id))?;
				next.name = name;
			}
			if let Some(display_name) = request.display_name {
				next.display_name = display_name;
			}
			if let Some(description) = request.description {
				next.description = Some(description);
			}
			if let Some(effect) = request.effect {
				next.effect = effect;
			}
			if let Some(priority) = request.priority {
				next.priority = priority;
			}
			if let Some(resources) = request.resources {
				next.resources = resources;
			}
			if let Some(actions) = request.actions {
				next.actions = actions;
			}
			if let Some(subjects) = request.subjects {
				next.subjects = subjects;
			}
			if let Some(conditions) = conditions {
				next.conditions = conditions;
			}
			validate_policy(&next, &self.limits)?;

			next.version += 1;
			next.updated_at = Utc::now();
			next.updated_by = actor.map(str::to_string);
			policies[index] = next.clone();
			Ok(next)
		})?;

		info!(policy_id = %updated.id, name = %updated.name, version = updated.version, "Policy updated");
		Ok(updated)
	}

	pub fn get_policy(&self, id: PolicyId) -> Result<Policy> {
		self.store
			.snapshot()
			.get(id)
			.cloned()
			.ok_or_else(|| PolicyServiceError::NotFound(id.to_string()))
	}

	pub fn get_policy_by_name(&self, name: &str) -> Result<Policy> {
		self.store
			.snapshot()
			.find_by_name(name)
			.cloned()
			.ok_or_else(|| PolicyServiceError::NotFound(name.to_string()))
	}

	/// Policies in creation order. A tenant filter keeps global policies.
	pub fn list_policies(&self, query: &ListPoliciesQuery) -> Vec<Policy> {
		self.store
			.snapshot()
			.policies
			.iter()
			.filter(|p| query.tenant_id.map_or(true, |t| p.tenant_id.map_or(true, |pt| pt == t)))
			.filter(|p| query.status.map_or(true, |s| p.status == s))
			.cloned()
			.collect()
	}

	#[instrument(skip(self), fields(policy_id = %id))]
	pub fn delete_policy(&self, id: PolicyId) -> Result<Policy> {
		let deleted = self.store.update(|policies| -> Result<_> {
			let index = position(policies, id)?;
			Ok(policies.remove(index))
		})?;

		info!(policy_id = %deleted.id, name = %deleted.name, version = deleted.version, "Policy deleted");
		Ok(deleted)
	}

	/// draft | inactive → active. Re-validates against the current limits.
	#[instrument(skip(self, actor), fields(policy_id = %id))]
	pub fn activate_policy(&self, id: PolicyId, actor: Option<&str>) -> Result<Policy> {
		self.transition(id, PolicyStatus::Active, actor, |from| {
			matches!(from, PolicyStatus::Draft | PolicyStatus::Inactive)
		})
	}

	/// active → inactive.
	#[instrument(skip(self, actor), fields(policy_id = %id))]
	pub fn deactivate_policy(&self, id: PolicyId, actor: Option<&str>) -> Result<Policy> {
		self.transition(id, PolicyStatus::Inactive, actor, |from| {
			from == PolicyStatus::Active
		})
	}

	/// Any status but archived → archived.
	#[instrument(skip(self, actor), fields(policy_id = %id))]
	pub fn archive_policy(&self, id: PolicyId, actor: Option<&str>) -> Result<Policy> {
		self.transition(id, PolicyStatus::Archived, actor, |from| {
			from != PolicyStatus::Archived
		})
	}

	fn transition(
		&self,
		id: PolicyId,
		to: PolicyStatus,
		actor: Option<&str>,
		allowed_from: impl Fn(PolicyStatus) -> bool,
	) -> Result<Policy> {
		let changed = self.store.update(|policies| -> Result<_> {
			let index = position(policies, id)?;
			let policy = &mut policies[index];
			if !allowed_from(policy.status) {
				return Err(PolicyServiceError::InvalidTransition {
					id,
					from: policy.status,
					to,
				});
			}
			if to == PolicyStatus::Active {
				validate_policy(policy, &self.limits)?;
			}

			policy.status = to;
			policy.updated_at = Utc::now();
			policy.updated_by = actor.map(str::to_string);
			Ok(policy.clone())
		})?;

		info!(
			policy_id = %changed.id,
			name = %changed.name,
			version = changed.version,
			status = %changed.status,
			"Policy status changed"
		);
		Ok(changed)
	}

	/// Evaluates one policy against a request as if it were active.
	///
	/// Backs the "Test Policy" screen, so drafts can be tried before they go
	/// live. Archived policies cannot be tested.
	#[instrument(skip(self, request), fields(policy_id = %id))]
	pub fn test_policy(&self, id: PolicyId, request: &EvaluationRequest) -> Result<EvaluationResult> {
		let mut policy = self.get_policy(id)?;
		if policy.status == PolicyStatus::Archived {
			return Err(PolicyServiceError::NotTestable(id));
		}
		policy.status = PolicyStatus::Active;
		Ok(decide_with(&[policy], request, &self.decision_options()))
	}

	/// The live decision over the current snapshot's active policies.
	pub fn evaluate(&self, request: &EvaluationRequest) -> EvaluationResult {
		let snapshot = self.store.snapshot();
		decide_with(&snapshot.policies, request, &self.decision_options())
	}

	fn decision_options(&self) -> DecisionOptions {
		DecisionOptions::from_limits(&self.limits)
	}
}

fn position(policies: &[Policy], id: PolicyId) -> Result<usize> {
	policies
		.iter()
		.position(|p| p.id == id)
		.ok_or_else(|| PolicyServiceError::NotFound(id.to_string()))
}

fn ensure_unique_name(policies: &[Policy], name: &str, except: Option<PolicyId>) -> Result<()> {
	let taken = policies
		.iter()
		.any(|p| p.name == name && Some(p.id) != except);
	if taken {
		Err(PolicyServiceError::DuplicateName(name.to_string()))
	} else {
		Ok(())
	}
}
