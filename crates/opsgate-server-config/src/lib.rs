// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the OpsGate policy engine.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`OPSGATE_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use opsgate_server_config::load_config;
//!
//! let config = load_config()?;
//! let limits = config.engine.limits();
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
	pub engine: EngineConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`OPSGATE_SERVER_*`)
/// 2. Config file (`/etc/opsgate/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let engine = layer.engine.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&engine)?;

	info!(
		max_condition_depth = engine.max_condition_depth,
		max_condition_nodes = engine.max_condition_nodes,
		evaluation_timeout_ms = engine.evaluation_timeout_ms,
		max_regex_size = engine.max_regex_size,
		log_level = %logging.level,
		"Server configuration loaded"
	);

	Ok(ServerConfig { engine, logging })
}

/// Validate cross-field configuration rules.
fn validate_config(engine: &EngineConfig) -> Result<(), ConfigError> {
	if engine.max_condition_depth == 0 || engine.max_condition_nodes == 0 {
		return Err(ConfigError::Validation(
			"engine.max_condition_depth and engine.max_condition_nodes must be at least 1"
				.to_string(),
		));
	}
	if engine.max_condition_depth > engine.max_condition_nodes {
		return Err(ConfigError::Validation(format!(
			"engine.max_condition_depth ({}) cannot exceed engine.max_condition_nodes ({})",
			engine.max_condition_depth, engine.max_condition_nodes
		)));
	}
	if engine.max_regex_size == 0 {
		return Err(ConfigError::Validation(
			"engine.max_regex_size must be at least 1".to_string(),
		));
	}

	Ok(())
}
