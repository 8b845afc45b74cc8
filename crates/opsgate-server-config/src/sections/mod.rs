// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for the OpsGate policy engine.

pub mod engine;
pub mod logging;

pub use engine::{EngineConfig, EngineConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
