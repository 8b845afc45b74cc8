// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand implementations. Files are JSON: a policy file holds an array of
//! policies, a request file holds one evaluation request.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use opsgate_abac_core::{validate_policy, EvaluationRequest, EvaluationResult, Policy};
use opsgate_server_config::EngineConfig;
use opsgate_server_policies::PolicyService;
use serde::Serialize;
use tracing::{info, warn};

pub fn load_policies(path: &Path) -> Result<Vec<Policy>> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("failed to read policies from {}", path.display()))?;
	serde_json::from_str(&content)
		.with_context(|| format!("failed to parse policies in {}", path.display()))
}

pub fn load_request(path: &Path) -> Result<EvaluationRequest> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("failed to read request from {}", path.display()))?;
	serde_json::from_str(&content)
		.with_context(|| format!("failed to parse request in {}", path.display()))
}

/// Writes one line per policy and returns the number that failed validation.
pub fn validate(path: &Path, engine: &EngineConfig, out: &mut impl Write) -> Result<usize> {
	let policies = load_policies(path)?;
	let limits = engine.limits();

	let mut failures = 0;
	for policy in &policies {
		match validate_policy(policy, &limits) {
			Ok(()) => writeln!(out, "ok      {}", policy.name)?,
			Err(e) => {
				failures += 1;
				warn!(name = %policy.name, error = %e, "policy failed validation");
				writeln!(out, "invalid {}: {}", policy.name, e)?;
			}
		}
	}

	info!(total = policies.len(), failures, "validation finished");
	Ok(failures)
}

fn load_service(path: &Path, engine: &EngineConfig) -> Result<PolicyService> {
	let service = PolicyService::from_config(engine);
	service
		.import_policies(load_policies(path)?)
		.with_context(|| format!("failed to load policies from {}", path.display()))?;
	Ok(service)
}

pub fn evaluate(policies: &Path, request: &Path, engine: &EngineConfig) -> Result<EvaluationResult> {
	let service = load_service(policies, engine)?;
	let request = load_request(request)?;
	Ok(service.evaluate(&request))
}

pub fn test(
	policies: &Path,
	name: &str,
	request: &Path,
	engine: &EngineConfig,
) -> Result<EvaluationResult> {
	let service = load_service(policies, engine)?;
	let request = load_request(request)?;
	let policy = service.get_policy_by_name(name)?;
	Ok(service.test_policy(policy.id, &request)?)
}

pub fn print_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
	serde_json::to_writer_pretty(&mut *out, value)?;
	writeln!(out)?;
	Ok(())
}
