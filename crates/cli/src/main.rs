// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `breeze-agent`: the operator-facing entry point. `run` execs `breezed` in
//! the foreground and waits on it; `service` manages it as a background
//! process.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod daemon_process;
mod env;
mod service;

use clap::{Parser, Subcommand};
use service::{PidFileServiceManager, ServiceManager};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "breeze-agent", version, about = "Endpoint agent control")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent in the foreground and block until it exits.
    Run {
        /// Path to a config file, overriding the platform default location.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Manage the agent as a background service.
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
}

#[derive(Subcommand)]
enum ServiceAction {
    /// Register the agent with the host's service manager.
    Install,
    /// Remove the agent's service manager registration.
    Uninstall,
    /// Start the agent in the background.
    Start,
    /// Stop a running background agent.
    Stop,
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run { config } => run(config.as_deref()),
        Commands::Service { action } => service_command(action),
    };

    std::process::exit(exit_code);
}

/// Execs `breezed` in the foreground and waits for it to exit, forwarding
/// its exit code. The daemon itself owns the lock file, logging, and
/// signal-triggered shutdown; this is a thin wrapper around it.
fn run(config: Option<&std::path::Path>) -> i32 {
    let mut child = match daemon_process::spawn(config, false) {
        Ok(child) => child,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };

    match child.wait() {
        Ok(status) => status.code().unwrap_or(1),
        Err(err) => {
            eprintln!("error: failed to wait on breezed: {err}");
            1
        }
    }
}

fn service_command(action: ServiceAction) -> i32 {
    let manager = PidFileServiceManager::new();
    let result = match action {
        ServiceAction::Install => manager.install(),
        ServiceAction::Uninstall => manager.uninstall(),
        ServiceAction::Start => manager.start(),
        ServiceAction::Stop => manager.stop(),
    };
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}
