// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{Platform, PlatformError, APP_DIR_NAME};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::os::unix::process::CommandExt as _;
use std::path::PathBuf;
use tokio::process::{Child, Command};

/// Unix platform state. `is_service_mode` checks for the signals a process
/// launched directly by systemd/launchd carries (no controlling terminal and
/// `INVOCATION_ID`/`XPC_SERVICE_NAME` set); any other environment is treated
/// as an interactive run.
pub struct UnixPlatform;

impl UnixPlatform {
    pub fn detect() -> Self {
        Self
    }
}

impl Default for UnixPlatform {
    fn default() -> Self {
        Self::detect()
    }
}

impl Platform for UnixPlatform {
    fn is_service_mode(&self) -> bool {
        std::env::var_os("INVOCATION_ID").is_some() || std::env::var_os("XPC_SERVICE_NAME").is_some()
    }

    fn data_dir(&self) -> Result<PathBuf, PlatformError> {
        if self.is_service_mode() {
            return Ok(system_data_dir());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PlatformError::NoDataDir)
    }

    fn new_process_group(&self, cmd: &mut Command) -> Result<(), PlatformError> {
        // SAFETY: pre_exec only calls async-signal-safe libc functions
        // (setsid) in the forked child before exec, as required by
        // `CommandExt::pre_exec`'s contract.
        #[allow(unsafe_code)]
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::from)?;
                Ok(())
            });
        }
        Ok(())
    }

    fn kill_process_group(&self, child: &mut Child) -> Result<(), PlatformError> {
        let Some(raw_pid) = child.id() else {
            // Already reaped; nothing left to signal.
            return Ok(());
        };
        let pgid = Pid::from_raw(-(raw_pid as i32));
        signal::kill(pgid, Signal::SIGKILL)
            .map_err(|errno| PlatformError::Signal(errno.to_string()))
    }
}

#[cfg(target_os = "macos")]
fn system_data_dir() -> PathBuf {
    PathBuf::from("/Library/Application Support").join(APP_DIR_NAME)
}

#[cfg(not(target_os = "macos"))]
fn system_data_dir() -> PathBuf {
    PathBuf::from("/var/lib").join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_run_without_service_env_uses_user_data_dir() {
        std::env::remove_var("INVOCATION_ID");
        std::env::remove_var("XPC_SERVICE_NAME");
        let platform = UnixPlatform::detect();
        assert!(!platform.is_service_mode());
        let dir = platform.data_dir().expect("dirs::data_dir should resolve in test env");
        assert!(dir.ends_with(APP_DIR_NAME));
    }

    #[test]
    fn system_data_dir_is_rooted_under_var_lib_or_application_support() {
        let dir = system_data_dir();
        assert!(dir.ends_with(APP_DIR_NAME));
    }
}
