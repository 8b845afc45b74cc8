// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use opsgate_abac_core::{PolicyId, PolicyStatus, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyServiceError {
	#[error("policy not found: {0}")]
	NotFound(String),

	#[error("a policy named '{0}' already exists")]
	DuplicateName(String),

	#[error("a policy with id {0} already exists")]
	DuplicateId(PolicyId),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error("cannot move policy {id} from {from} to {to}")]
	InvalidTransition {
		id: PolicyId,
		from: PolicyStatus,
		to: PolicyStatus,
	},

	#[error("policy {id} is {status}; only draft or inactive policies can be edited")]
	NotEditable { id: PolicyId, status: PolicyStatus },

	#[error("policy {0} is archived and cannot be tested")]
	NotTestable(PolicyId),
}

pub type Result<T> = std::result::Result<T, PolicyServiceError>;
