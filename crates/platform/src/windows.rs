// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{Platform, PlatformError, APP_DIR_NAME};
use std::path::PathBuf;
use tokio::process::{Child, Command};

/// Windows platform state.
///
/// `kill_process_group` is a known limitation on this platform: without the
/// `CREATE_NEW_PROCESS_GROUP`/job-object machinery this crate does not yet
/// wire up, killing the root child process is all that's implemented. A
/// handler whose child spawns grandchildren will leak them.
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn detect() -> Self {
        Self
    }
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::detect()
    }
}

impl Platform for WindowsPlatform {
    fn is_service_mode(&self) -> bool {
        // The Windows Service Control Manager launches services in session 0
        // with no attached console; a simple, dependency-free proxy for that
        // is the absence of a console window handle.
        std::env::var_os("SESSIONNAME").is_none()
    }

    fn data_dir(&self) -> Result<PathBuf, PlatformError> {
        if self.is_service_mode() {
            if let Some(program_data) = std::env::var_os("ProgramData") {
                return Ok(PathBuf::from(program_data).join("Breeze").join("data"));
            }
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PlatformError::NoDataDir)
    }

    fn new_process_group(&self, _cmd: &mut Command) -> Result<(), PlatformError> {
        Ok(())
    }

    fn kill_process_group(&self, child: &mut Child) -> Result<(), PlatformError> {
        // Root-process-only kill: see the module doc comment.
        if child.id().is_none() {
            return Ok(());
        }
        child
            .start_kill()
            .map_err(|err| PlatformError::Signal(err.to_string()))
    }
}
