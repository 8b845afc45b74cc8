// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Copy-on-write policy store.
//!
//! Readers clone an `Arc` to the current [`PolicySnapshot`] and decide against
//! it without holding any lock. Writers build a new snapshot from a copy of the
//! old one and swap it in, so a decision in flight never observes a refresh.

use std::sync::Arc;

use opsgate_abac_core::{Policy, PolicyId};
use parking_lot::{Mutex, RwLock};
use tracing::trace;

/// An immutable, versioned view of every stored policy, in creation order.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
	pub version: u64,
	pub policies: Vec<Policy>,
}

impl PolicySnapshot {
	pub fn get(&self, id: PolicyId) -> Option<&Policy> {
		self.policies.iter().find(|p| p.id == id)
	}

	pub fn find_by_name(&self, name: &str) -> Option<&Policy> {
		self.policies.iter().find(|p| p.name == name)
	}

	pub fn active(&self) -> impl Iterator<Item = &Policy> {
		self.policies.iter().filter(|p| p.is_active())
	}

	pub fn len(&self) -> usize {
		self.policies.len()
	}

	pub fn is_empty(&self) -> bool {
		self.policies.is_empty()
	}
}

#[derive(Debug, Default)]
pub struct PolicyStore {
	current: RwLock<Arc<PolicySnapshot>>,
	/// Serializes writers so read-modify-write cycles never interleave.
	writer: Mutex<()>,
}

impl PolicyStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_policies(policies: Vec<Policy>) -> Self {
		Self {
			current: RwLock::new(Arc::new(PolicySnapshot {
				version: 1,
				policies,
			})),
			writer: Mutex::new(()),
		}
	}

	/// The current snapshot. Cheap: one `Arc` clone under a read lock.
	pub fn snapshot(&self) -> Arc<PolicySnapshot> {
		Arc::clone(&self.current.read())
	}

	pub fn version(&self) -> u64 {
		self.current.read().version
	}

	/// Applies `mutate` to a copy of the policy list and publishes the result.
	///
	/// If `mutate` fails nothing is published.
	pub fn update<T, E>(
		&self,
		mutate: impl FnOnce(&mut Vec<Policy>) -> Result<T, E>,
	) -> Result<T, E> {
		let _writer = self.writer.lock();
		let base = self.snapshot();

		let mut policies = base.policies.clone();
		let output = mutate(&mut policies)?;

		let next = Arc::new(PolicySnapshot {
			version: base.version + 1,
			policies,
		});
		trace!(version = next.version, policies = next.len(), "publishing policy snapshot");
		*self.current.write() = next;
		Ok(output)
	}
}
