// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability seam for registering `breeze-agent` with the host's service
//! manager (systemd, launchd, the Windows SCM). Actually talking to one of
//! those is out of scope here: [`PidFileServiceManager`] logs what it would
//! do for `install`/`uninstall` and falls back to PID-file probing for
//! `start`/`stop`, which works unconditionally on any Unix host.

use crate::daemon_process::{self, DaemonProcessError};
use breeze_platform::{NativePlatform, Platform};
use std::time::Duration;
use thiserror::Error;

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    DaemonProcess(#[from] DaemonProcessError),
}

pub trait ServiceManager {
    fn install(&self) -> Result<(), ServiceError>;
    fn uninstall(&self) -> Result<(), ServiceError>;
    fn start(&self) -> Result<(), ServiceError>;
    fn stop(&self) -> Result<(), ServiceError>;
}

/// The only [`ServiceManager`] this crate ships. `install`/`uninstall` are
/// logging-only placeholders: registering a real unit file with systemd,
/// launchd, or the Windows SCM is host-integration work left to the
/// deployment tooling that packages this binary.
pub struct PidFileServiceManager {
    platform: NativePlatform,
}

impl PidFileServiceManager {
    pub fn new() -> Self {
        Self { platform: NativePlatform::default() }
    }

    fn lock_path(&self) -> Result<std::path::PathBuf, ServiceError> {
        let data_dir = self.platform.data_dir().map_err(DaemonProcessError::Platform)?;
        Ok(data_dir.join("breezed.pid"))
    }
}

impl Default for PidFileServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager for PidFileServiceManager {
    fn install(&self) -> Result<(), ServiceError> {
        println!("service install: no host service manager integration is configured;");
        println!("run `breeze-agent service start` to launch breezed in the background,");
        println!("or start it under your own service manager with `breeze-agent run`.");
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        println!("service uninstall: nothing registered with a host service manager to remove.");
        Ok(())
    }

    fn start(&self) -> Result<(), ServiceError> {
        let lock_path = self.lock_path()?;
        if let Some(pid) = daemon_process::read_pid(&lock_path)? {
            if daemon_process::process_exists(pid) {
                println!("breeze-agent is already running (pid {pid})");
                return Ok(());
            }
        }
        let child = daemon_process::spawn(None, true)?;
        println!("breeze-agent started (pid {})", child.id());
        Ok(())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        let lock_path = self.lock_path()?;
        match daemon_process::stop_and_wait(&lock_path, STOP_TIMEOUT) {
            Ok(()) => {
                println!("breeze-agent stopped");
                Ok(())
            }
            Err(DaemonProcessError::NotRunning) => {
                println!("breeze-agent is not running");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
