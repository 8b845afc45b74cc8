// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy administration for OpsGate.
//!
//! [`PolicyService`] backs the policy console: create and edit drafts, move
//! policies through their lifecycle, test a single policy against a request,
//! and answer live decisions. Policies live in a copy-on-write
//! [`PolicyStore`], so every decision runs against one immutable snapshot.

pub mod api;
pub mod error;
pub mod service;
pub mod store;

pub use api::{
	CreatePolicyRequest, ListPoliciesQuery, ListPoliciesResponse, PolicyResponse,
	TestPolicyResponse, UpdatePolicyRequest,
};
pub use error::{PolicyServiceError, Result};
pub use service::PolicyService;
pub use store::{PolicySnapshot, PolicyStore};
