// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy, request and decision types.
//!
//! Every type here serializes to the JSON the policy console exchanges with
//! the engine, so decisions can be logged and replayed verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::condition::{optional_wire, ConditionNode};

/// Unique identifier for a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub Uuid);

impl PolicyId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for PolicyId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for PolicyId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for PolicyId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Unique identifier for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for TenantId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for TenantId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for TenantId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Outcome a policy produces when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effect {
	Allow,
	Deny,
}

impl Effect {
	pub fn as_str(&self) -> &'static str {
		match self {
			Effect::Allow => "ALLOW",
			Effect::Deny => "DENY",
		}
	}
}

impl std::fmt::Display for Effect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Lifecycle state of a policy. Only `Active` policies are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
	#[default]
	Draft,
	Active,
	Inactive,
	Archived,
}

impl PolicyStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			PolicyStatus::Draft => "draft",
			PolicyStatus::Active => "active",
			PolicyStatus::Inactive => "inactive",
			PolicyStatus::Archived => "archived",
		}
	}

	/// Draft and inactive policies may be edited in place.
	pub fn is_editable(&self) -> bool {
		matches!(self, PolicyStatus::Draft | PolicyStatus::Inactive)
	}
}

impl std::fmt::Display for PolicyStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Restricts which subjects a policy applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectMatcher {
	Id { id: String },
	Type { subject_type: String },
	Attribute { condition: ConditionNode },
}

/// An ABAC policy. Owns its condition tree exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
	#[serde(default)]
	pub id: PolicyId,
	/// Unique slug.
	pub name: String,
	pub display_name: String,
	#[serde(default)]
	pub description: Option<String>,
	pub effect: Effect,
	/// Lower number wins.
	pub priority: i32,
	#[serde(default)]
	pub status: PolicyStatus,
	/// `None` = global policy.
	#[serde(default)]
	pub tenant_id: Option<TenantId>,
	pub resources: Vec<String>,
	pub actions: Vec<String>,
	/// Empty = applies to every subject.
	#[serde(default)]
	pub subjects: Vec<SubjectMatcher>,
	/// `None` = unconditional.
	#[serde(default, with = "optional_wire")]
	pub conditions: Option<ConditionNode>,
	#[serde(default = "initial_version")]
	pub version: u64,
	#[serde(default = "Utc::now")]
	pub created_at: DateTime<Utc>,
	#[serde(default = "Utc::now")]
	pub updated_at: DateTime<Utc>,
	#[serde(default)]
	pub created_by: Option<String>,
	#[serde(default)]
	pub updated_by: Option<String>,
}

fn initial_version() -> u64 {
	1
}

impl Policy {
	/// Creates an unconditional draft policy with no resources or actions.
	pub fn new(name: impl Into<String>, effect: Effect, priority: i32) -> Self {
		let name = name.into();
		let now = Utc::now();
		Self {
			id: PolicyId::new(),
			display_name: name.clone(),
			name,
			description: None,
			effect,
			priority,
			status: PolicyStatus::Draft,
			tenant_id: None,
			resources: Vec::new(),
			actions: Vec::new(),
			subjects: Vec::new(),
			conditions: None,
			version: initial_version(),
			created_at: now,
			updated_at: now,
			created_by: None,
			updated_by: None,
		}
	}

	/// Builder: set resource patterns.
	pub fn with_resources<I, S>(mut self, resources: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.resources = resources.into_iter().map(Into::into).collect();
		self
	}

	/// Builder: set action patterns.
	pub fn with_actions<I, S>(mut self, actions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.actions = actions.into_iter().map(Into::into).collect();
		self
	}

	/// Builder: set the condition tree.
	pub fn with_conditions(mut self, conditions: ConditionNode) -> Self {
		self.conditions = Some(conditions);
		self
	}

	/// Builder: add a subject matcher.
	pub fn with_subject(mut self, matcher: SubjectMatcher) -> Self {
		self.subjects.push(matcher);
		self
	}

	/// Builder: scope to a tenant.
	pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
		self.tenant_id = Some(tenant_id);
		self
	}

	/// Builder: set status.
	pub fn with_status(mut self, status: PolicyStatus) -> Self {
		self.status = status;
		self
	}

	/// Builder: set creation time.
	pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
		self.created_at = created_at;
		self.updated_at = created_at;
		self
	}

	pub fn is_active(&self) -> bool {
		self.status == PolicyStatus::Active
	}

	pub fn is_global(&self) -> bool {
		self.tenant_id.is_none()
	}
}

/// The party requesting access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
	pub id: String,
	#[serde(rename = "type", default = "default_subject_type")]
	pub subject_type: String,
	#[serde(default)]
	pub attributes: Map<String, Value>,
}

fn default_subject_type() -> String {
	"user".to_string()
}

impl Subject {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			subject_type: default_subject_type(),
			attributes: Map::new(),
		}
	}

	/// Builder: set subject type.
	pub fn with_type(mut self, subject_type: impl Into<String>) -> Self {
		self.subject_type = subject_type.into();
		self
	}

	/// Builder: add an attribute.
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}
}

/// An access question: may `subject` perform `action` on `resource`?
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
	pub subject: Subject,
	pub action: String,
	/// `type:id` or a bare `type`.
	pub resource: String,
	/// Environment attributes, read through `environment.*`.
	#[serde(default)]
	pub context: Map<String, Value>,
	/// `None` = only global policies are in scope.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tenant_id: Option<TenantId>,
	/// Explicit `resource.*` attributes. When absent, `resource.type` and
	/// `resource.id` are derived from the resource string.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource_attributes: Option<Map<String, Value>>,
}

impl EvaluationRequest {
	pub fn new(subject: Subject, action: impl Into<String>, resource: impl Into<String>) -> Self {
		Self {
			subject,
			action: action.into(),
			resource: resource.into(),
			context: Map::new(),
			tenant_id: None,
			resource_attributes: None,
		}
	}

	/// Builder: add an environment attribute.
	pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.context.insert(key.into(), value.into());
		self
	}

	/// Builder: add an explicit resource attribute.
	pub fn with_resource_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self
			.resource_attributes
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	/// Builder: set the requesting tenant.
	pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
		self.tenant_id = Some(tenant_id);
		self
	}
}

/// Audit entry for a policy that matched a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPolicy {
	pub id: PolicyId,
	pub name: String,
	pub effect: Effect,
	pub priority: i32,
}

impl From<&Policy> for MatchedPolicy {
	fn from(policy: &Policy) -> Self {
		Self {
			id: policy.id,
			name: policy.name.clone(),
			effect: policy.effect,
			priority: policy.priority,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationDetails {
	pub conditions_evaluated: u32,
	pub conditions_passed: u32,
	pub reason: String,
}

/// The decision returned to the authorization gate and the "Test Policy" screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
	pub result: Effect,
	/// Every matching policy in precedence order, winner first.
	pub matched_policies: Vec<MatchedPolicy>,
	pub evaluation_time_ms: f64,
	pub timestamp: DateTime<Utc>,
	pub details: EvaluationDetails,
}

impl EvaluationResult {
	/// A DENY with no matches.
	pub fn deny(reason: impl Into<String>) -> Self {
		Self {
			result: Effect::Deny,
			matched_policies: Vec::new(),
			evaluation_time_ms: 0.0,
			timestamp: Utc::now(),
			details: EvaluationDetails {
				reason: reason.into(),
				..Default::default()
			},
		}
	}

	pub fn is_allowed(&self) -> bool {
		self.result == Effect::Allow
	}
}
