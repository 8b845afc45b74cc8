// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decision engine configuration section.

use std::time::Duration;

use opsgate_abac_core::validation::{
	DEFAULT_MAX_CONDITION_DEPTH, DEFAULT_MAX_CONDITION_NODES, DEFAULT_MAX_REGEX_SIZE,
};
use opsgate_abac_core::EngineLimits;
use serde::{Deserialize, Serialize};

const DEFAULT_EVALUATION_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigLayer {
	pub max_condition_depth: Option<usize>,
	pub max_condition_nodes: Option<usize>,
	pub evaluation_timeout_ms: Option<u64>,
	pub max_regex_size: Option<usize>,
}

impl EngineConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.max_condition_depth.is_some() {
			self.max_condition_depth = other.max_condition_depth;
		}
		if other.max_condition_nodes.is_some() {
			self.max_condition_nodes = other.max_condition_nodes;
		}
		if other.evaluation_timeout_ms.is_some() {
			self.evaluation_timeout_ms = other.evaluation_timeout_ms;
		}
		if other.max_regex_size.is_some() {
			self.max_regex_size = other.max_regex_size;
		}
	}

	pub fn finalize(self) -> EngineConfig {
		EngineConfig {
			max_condition_depth: self
				.max_condition_depth
				.unwrap_or(DEFAULT_MAX_CONDITION_DEPTH),
			max_condition_nodes: self
				.max_condition_nodes
				.unwrap_or(DEFAULT_MAX_CONDITION_NODES),
			evaluation_timeout_ms: self
				.evaluation_timeout_ms
				.unwrap_or(DEFAULT_EVALUATION_TIMEOUT_MS),
			max_regex_size: self.max_regex_size.unwrap_or(DEFAULT_MAX_REGEX_SIZE),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
	pub max_condition_depth: usize,
	pub max_condition_nodes: usize,
	/// 0 disables the deadline.
	pub evaluation_timeout_ms: u64,
	/// Compiled size limit for `MATCHES` patterns, in bytes.
	pub max_regex_size: usize,
}

impl EngineConfig {
	pub fn evaluation_timeout(&self) -> Option<Duration> {
		(self.evaluation_timeout_ms > 0).then(|| Duration::from_millis(self.evaluation_timeout_ms))
	}

	pub fn limits(&self) -> EngineLimits {
		EngineLimits {
			max_condition_depth: self.max_condition_depth,
			max_condition_nodes: self.max_condition_nodes,
			max_regex_size: self.max_regex_size,
			evaluation_timeout: self.evaluation_timeout(),
		}
	}
}

impl Default for EngineConfig {
	fn default() -> Self {
		EngineConfigLayer::default().finalize()
	}
}
