// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `breezed`: the agent process. Typically started by the host's service
//! manager; `breeze-cli run` execs this binary directly for an interactive
//! foreground run.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use breeze_daemon::{LifecycleError, Orchestrator};
use breeze_platform::NativePlatform;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config_override = match parse_args() {
        Ok(path) => path,
        Err(code) => std::process::exit(code),
    };

    let platform = Arc::new(NativePlatform::default());
    let orchestrator = match Orchestrator::start(platform, config_override).await {
        Ok(orchestrator) => orchestrator,
        Err(LifecycleError::LockHeld(_)) => {
            eprintln!("breezed is already running");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("breezed failed to start: {err}");
            std::process::exit(1);
        }
    };

    let stop = orchestrator.stop_handle();
    spawn_signal_watcher(stop);

    if let Err(err) = orchestrator.run().await {
        eprintln!("breezed shutdown reported an error: {err}");
        std::process::exit(1);
    }
}

/// Hand-rolled instead of `clap`: this binary isn't meant to be invoked
/// directly by operators (`breeze-agent run` is), so its argument surface
/// stays tiny.
fn parse_args() -> Result<Option<PathBuf>, i32> {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("breezed {}", env!("CARGO_PKG_VERSION"));
                return Err(0);
            }
            "--help" | "-h" => {
                println!("breezed {}", env!("CARGO_PKG_VERSION"));
                println!("Endpoint agent process. Started by the host service manager,");
                println!("or in the foreground via `breeze-agent run`.");
                return Err(0);
            }
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("error: --config requires a path argument");
                    return Err(2);
                };
                config_path = Some(PathBuf::from(path));
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                return Err(2);
            }
        }
    }
    Ok(config_path)
}

#[cfg(unix)]
fn spawn_signal_watcher(stop: breeze_daemon::StopHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                return;
            }
        };
        let mut int = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGINT handler");
                return;
            }
        };
        let mut hup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGHUP handler");
                return;
            }
        };
        loop {
            tokio::select! {
                _ = term.recv() => {
                    tracing::info!("received SIGTERM");
                    stop.request_stop();
                    return;
                }
                _ = int.recv() => {
                    tracing::info!("received SIGINT");
                    stop.request_stop();
                    return;
                }
                _ = hup.recv() => {
                    tracing::info!("received SIGHUP");
                    stop.request_reload();
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_signal_watcher(stop: breeze_daemon::StopHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c");
            stop.request_stop();
        }
    });
}
