// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reads a TOML config file into a [`breeze_core::Config`] and runs
//! validation. A missing file is not an error: a fresh install starts from
//! `Config::default()` so the daemon at least comes up and reports its
//! identity, even with nothing configured yet.

use breeze_core::{Config, ValidationReport};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file at {path}: {source}")]
    Read { path: std::path::PathBuf, source: std::io::Error },
    #[error("failed to parse config file at {path}: {source}")]
    Parse { path: std::path::PathBuf, source: toml::de::Error },
    #[error("config validation failed: {0:?}")]
    Fatal(Vec<breeze_core::FatalError>),
}

/// Loads, parses, and validates the config at `path`. Clamp warnings are
/// returned alongside the config for the caller to log; fatal violations
/// abort loading entirely.
pub fn load(path: &Path) -> Result<(Config, ValidationReport), ConfigLoadError> {
    let mut config = if path.exists() {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigLoadError::Parse {
            path: path.to_owned(),
            source,
        })?
    } else {
        Config::default()
    };

    let report = breeze_core::config::validate(&mut config);
    if report.is_fatal() {
        return Err(ConfigLoadError::Fatal(report.fatals));
    }
    Ok((config, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let (config, report) = load(&path).unwrap();
        assert!(!report.is_fatal());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn malformed_url_is_reported_as_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "agent_id = \"{}\"", uuid::Uuid::new_v4()).unwrap();
        writeln!(file, "server_url = \"ftp://example.com\"").unwrap();
        writeln!(file, "credential = \"tok\"").unwrap();
        drop(file);

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Fatal(_)));
    }

    #[test]
    fn valid_file_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let agent_id = uuid::Uuid::new_v4().to_string();
        std::fs::write(
            &path,
            format!(
                "agent_id = \"{agent_id}\"\nserver_url = \"https://rmm.example.com\"\ncredential = \"tok-123\"\n"
            ),
        )
        .unwrap();

        let (config, report) = load(&path).unwrap();
        assert!(!report.is_fatal());
        assert_eq!(config.agent_id, agent_id);
        assert_eq!(config.server_url, "https://rmm.example.com");
    }
}
