// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawning and signaling the `breezed` binary, plus PID-file-based liveness
//! probing for platforms with no native service manager integration.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonProcessError {
    #[error("failed to determine data directory: {0}")]
    Platform(#[from] breeze_platform::PlatformError),
    #[error("failed to start breezed: {0}")]
    StartFailed(std::io::Error),
    #[error("breezed is not running")]
    NotRunning,
}

/// Spawns `breezed` and returns the child handle. `config_path`, if given,
/// is forwarded as `breezed --config <path>`.
pub fn spawn(config_path: Option<&Path>, background: bool) -> Result<std::process::Child, DaemonProcessError> {
    let binary = find_breezed_binary();
    let mut cmd = Command::new(&binary);
    if let Some(path) = config_path {
        cmd.arg("--config").arg(path);
    }
    if background {
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
    }
    cmd.spawn().map_err(DaemonProcessError::StartFailed)
}

/// Sends SIGTERM, polls for exit, escalates to SIGKILL if the process is
/// still alive after `timeout`.
pub fn stop_and_wait(lock_path: &Path, timeout: Duration) -> Result<(), DaemonProcessError> {
    let pid = read_pid(lock_path)?.ok_or(DaemonProcessError::NotRunning)?;
    kill_signal("-15", pid);

    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    if process_exists(pid) {
        kill_signal("-9", pid);
    }
    Ok(())
}

/// Reads the PID recorded by `breezed`'s startup lock file, returning `None`
/// if no lock file exists or it can't be parsed.
pub fn read_pid(lock_path: &Path) -> Result<Option<u32>, DaemonProcessError> {
    if !lock_path.exists() {
        return Ok(None);
    }
    match std::fs::read_to_string(lock_path) {
        Ok(content) => Ok(content.trim().parse::<u32>().ok()),
        Err(_) => Ok(None),
    }
}

#[cfg(unix)]
fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn kill_signal(_signal: &str, _pid: u32) -> bool {
    false
}

#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

#[cfg(not(unix))]
pub fn process_exists(_pid: u32) -> bool {
    false
}

/// Locates the `breezed` binary: an env override, then a sibling of the
/// currently-running executable, then whatever `$PATH` resolves.
fn find_breezed_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("breezed");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("breezed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_lock_file_reports_no_pid() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("breezed.pid");
        assert_eq!(read_pid(&lock_path).unwrap(), None);
    }

    #[test]
    fn lock_file_pid_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("breezed.pid");
        std::fs::write(&lock_path, "4242\n").unwrap();
        assert_eq!(read_pid(&lock_path).unwrap(), Some(4242));
    }

    #[test]
    fn stop_on_a_pid_that_is_not_running_still_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("breezed.pid");
        std::fs::write(&lock_path, "999999\n").unwrap();
        assert!(stop_and_wait(&lock_path, Duration::from_millis(100)).is_ok());
    }
}
