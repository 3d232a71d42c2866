// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout under the platform data directory.

use breeze_platform::{Platform, PlatformError};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub lock_path: PathBuf,
    pub audit_path: PathBuf,
    pub log_path: PathBuf,
}

impl Paths {
    pub fn under(platform: &dyn Platform) -> Result<Self, PlatformError> {
        let root = platform.data_dir()?;
        Ok(Self {
            config_path: root.join("config.toml"),
            lock_path: root.join("breezed.pid"),
            audit_path: root.join("audit.log"),
            log_path: root.join("breezed.log"),
            root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePlatform(PathBuf);
    impl Platform for FakePlatform {
        fn is_service_mode(&self) -> bool {
            false
        }
        fn data_dir(&self) -> Result<PathBuf, PlatformError> {
            Ok(self.0.clone())
        }
        fn new_process_group(&self, _cmd: &mut tokio::process::Command) -> Result<(), PlatformError> {
            Ok(())
        }
        fn kill_process_group(&self, _child: &mut tokio::process::Child) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    #[test]
    fn paths_are_rooted_under_the_platform_data_dir() {
        let platform = FakePlatform(PathBuf::from("/tmp/breeze-test"));
        let paths = Paths::under(&platform).unwrap();
        assert_eq!(paths.config_path, PathBuf::from("/tmp/breeze-test/config.toml"));
        assert_eq!(paths.lock_path, PathBuf::from("/tmp/breeze-test/breezed.pid"));
    }
}
