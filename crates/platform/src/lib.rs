// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Global process state behind a trait: whether we're running under a service
//! manager, where persistent data lives, and how to own/kill a child process
//! group. Every call site takes `&dyn Platform` rather than reading the
//! environment directly, so tests can swap in a double.

use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("no data directory available for this platform")]
    NoDataDir,
    #[error("failed to create process group: {0}")]
    ProcessGroup(String),
    #[error("failed to signal process group: {0}")]
    Signal(String),
}

/// Global process/platform state, injected once at startup.
pub trait Platform: Send + Sync {
    /// Whether the current process was launched by a service manager
    /// (systemd, launchd, Windows SCM) rather than an interactive shell.
    fn is_service_mode(&self) -> bool;

    /// The directory the agent should persist state (audit log, config
    /// cache) under.
    fn data_dir(&self) -> Result<PathBuf, PlatformError>;

    /// Configures `cmd` so the spawned child becomes the leader of a new
    /// process group, letting [`Self::kill_process_group`] later reach every
    /// descendant it spawns.
    fn new_process_group(&self, cmd: &mut Command) -> Result<(), PlatformError>;

    /// Terminates every process in the group led by `child`.
    fn kill_process_group(&self, child: &mut tokio::process::Child) -> Result<(), PlatformError>;
}

/// The name under which the agent's data directory is created, appended to
/// each platform's base application-data path.
const APP_DIR_NAME: &str = "breeze";

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UnixPlatform as NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsPlatform as NativePlatform;

#[cfg(all(test, unix))]
#[path = "process_group_tests.rs"]
mod process_group_tests;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    pub struct FakePlatform {
        pub service_mode: AtomicBool,
        pub dir: PathBuf,
    }

    impl Platform for FakePlatform {
        fn is_service_mode(&self) -> bool {
            self.service_mode.load(Ordering::SeqCst)
        }
        fn data_dir(&self) -> Result<PathBuf, PlatformError> {
            Ok(self.dir.clone())
        }
        fn new_process_group(&self, _cmd: &mut Command) -> Result<(), PlatformError> {
            Ok(())
        }
        fn kill_process_group(&self, _child: &mut tokio::process::Child) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    #[test]
    fn fake_platform_reports_configured_mode_and_dir() {
        let fake = FakePlatform {
            service_mode: AtomicBool::new(true),
            dir: PathBuf::from("/tmp/breeze-test"),
        };
        assert!(fake.is_service_mode());
        assert_eq!(fake.data_dir().unwrap(), PathBuf::from("/tmp/breeze-test"));
    }
}
