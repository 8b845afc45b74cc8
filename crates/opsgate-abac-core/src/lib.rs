// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute-based access control for OpsGate.
//!
//! This crate holds the policy model and the decision engine that the policy
//! console administers. It is pure and synchronous: a decision is a function
//! of an immutable policy snapshot and a request.
//!
//! ```text
//! EvaluationRequest ─▶ pdp::decide ─▶ matcher (per policy)
//!                                        └─▶ evaluator (per tree)
//!                                              └─▶ template ─▶ resolver (per leaf)
//! ```
//!
//! Decisions are first-applicable: matching policies are ordered by priority
//! (lower wins) and the first one's effect is the answer. No match is DENY.

pub mod catalog;
pub mod condition;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod operator;
pub mod pdp;
pub mod resolver;
pub mod template;
pub mod types;
pub mod validation;
pub mod value;

pub use condition::{parse_conditions, Condition, ConditionGroup, ConditionNode};
pub use error::{EvaluationError, Result, ValidationError};
pub use evaluator::{ConditionEvaluator, EvaluationStats};
pub use matcher::{action_matches, matches, resource_matches};
pub use operator::Operator;
pub use pdp::{decide, decide_with, DecisionOptions, NO_MATCH_REASON, TIMEOUT_REASON};
pub use resolver::{resolve, EvaluationContext};
pub use template::resolve_template;
pub use types::{
	Effect, EvaluationDetails, EvaluationRequest, EvaluationResult, MatchedPolicy, Policy, PolicyId,
	PolicyStatus, Subject, SubjectMatcher, TenantId,
};
pub use validation::{validate_policy, EngineLimits};
