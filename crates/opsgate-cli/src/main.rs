// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OpsGate policy engine command line.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod version;

/// OpsGate - validate policies and evaluate access decisions offline.
#[derive(Parser, Debug)]
#[command(name = "opsgate", about = "OpsGate ABAC policy engine", version)]
struct Args {
	/// Server configuration file (defaults to /etc/opsgate/server.toml)
	#[arg(long, global = true, env = "OPSGATE_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Validate a JSON array of policies
	Validate {
		#[arg(long)]
		policies: PathBuf,
	},

	/// Decide a request against a JSON array of policies
	Evaluate {
		#[arg(long)]
		policies: PathBuf,
		#[arg(long)]
		request: PathBuf,
	},

	/// Evaluate a single policy as if it were active
	Test {
		#[arg(long)]
		policies: PathBuf,
		/// Name (slug) of the policy to test
		#[arg(long)]
		name: String,
		#[arg(long)]
		request: PathBuf,
	},

	/// Print the attribute and operator catalog
	Catalog,

	/// Show version and build information
	Version,
}

fn main() -> anyhow::Result<ExitCode> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(ExitCode::SUCCESS);
	}

	let config = match &args.config {
		Some(path) => opsgate_server_config::load_config_with_file(path)?,
		None => opsgate_server_config::load_config()?,
	};

	// stdout carries command output; logs go to stderr.
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	tracing::debug!(command = ?args.command, "starting opsgate");

	let mut stdout = std::io::stdout().lock();
	match args.command {
		Command::Validate { policies } => {
			let failures = commands::validate(&policies, &config.engine, &mut stdout)?;
			if failures > 0 {
				return Ok(ExitCode::FAILURE);
			}
		}
		Command::Evaluate { policies, request } => {
			let result = commands::evaluate(&policies, &request, &config.engine)?;
			commands::print_json(&mut stdout, &result)?;
		}
		Command::Test {
			policies,
			name,
			request,
		} => {
			let result = commands::test(&policies, &name, &request, &config.engine)?;
			commands::print_json(&mut stdout, &result)?;
		}
		Command::Catalog => {
			commands::print_json(&mut stdout, &opsgate_abac_core::catalog::catalog())?;
		}
		// Printed before configuration is loaded.
		Command::Version => {}
	}

	Ok(ExitCode::SUCCESS)
}
