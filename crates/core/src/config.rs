// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration record and validation.
//!
//! `Config` itself is a plain data record; parsing a config *file* into one is
//! an external collaborator's job. `validate` is the core
//! contract: it never panics, never bails early, and reports every problem it
//! finds in one pass, clamping in place where a field is recoverable.

use serde::{Deserialize, Serialize};

/// Output format for the logging sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Pretty
    }
}

const INTERVAL_MIN_SECS: u64 = 5;
const INTERVAL_MAX_SECS: u64 = 3600;
const CONCURRENCY_MIN: u32 = 1;
const CONCURRENCY_MAX: u32 = 100;
const QUEUE_DEPTH_MIN: u32 = 1;
const QUEUE_DEPTH_MAX: u32 = 10_000;

const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const KNOWN_COLLECTORS: &[&str] = &["hardware", "software", "metrics", "network", "patch"];

/// Immutable-after-validation agent configuration.
///
/// `#[serde(default)]` so a config file only has to name the fields it wants
/// to override; anything else falls back to [`Config::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent_id: String,
    pub server_url: String,
    /// Plaintext credential as loaded from disk. The lifecycle orchestrator
    /// moves this into the Secret Store at startup and blanks this field.
    pub credential: String,
    pub heartbeat_interval_secs: u64,
    pub metrics_interval_secs: u64,
    pub collectors: Vec<String>,
    pub max_concurrent_commands: u32,
    pub command_queue_depth: u32,
    pub audit_enabled: bool,
    pub audit_rotation_mb: u64,
    pub audit_backup_count: u32,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_id: uuid::Uuid::new_v4().to_string(),
            server_url: "https://localhost".to_string(),
            credential: String::new(),
            heartbeat_interval_secs: 30,
            metrics_interval_secs: 60,
            collectors: Vec::new(),
            max_concurrent_commands: 10,
            command_queue_depth: 256,
            audit_enabled: true,
            audit_rotation_mb: 50,
            audit_backup_count: 3,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// A condition that prevents startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FatalError {
    #[error("agent_id {0:?} is not a UUID or hex identity")]
    MalformedIdentity(String),
    #[error("server_url {0:?} must use http or https")]
    BadServerUrlScheme(String),
    #[error("server_url {0:?} is not a valid URL")]
    UnparsableServerUrl(String),
    #[error("credential contains control characters")]
    CredentialControlCharacters,
}

/// A condition that is clamped and logged, but does not prevent startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("heartbeat_interval_secs {0} clamped to [{INTERVAL_MIN_SECS}, {INTERVAL_MAX_SECS}]")]
    HeartbeatIntervalClamped(u64),
    #[error("metrics_interval_secs {0} clamped to [{INTERVAL_MIN_SECS}, {INTERVAL_MAX_SECS}]")]
    MetricsIntervalClamped(u64),
    #[error("max_concurrent_commands {0} clamped to [{CONCURRENCY_MIN}, {CONCURRENCY_MAX}]")]
    ConcurrencyClamped(u32),
    #[error("command_queue_depth {0} clamped to [{QUEUE_DEPTH_MIN}, {QUEUE_DEPTH_MAX}]")]
    QueueDepthClamped(u32),
    #[error("unknown collector name {0:?}")]
    UnknownCollector(String),
    #[error("unknown log level {0:?}, defaulting to \"info\"")]
    UnknownLogLevel(String),
}

/// Names of the fields that changed between two configuration snapshots —
/// not their values. A `config_change` audit entry records which settings
/// moved, not a second copy of anything credential-adjacent.
pub type FieldDiff = Vec<&'static str>;

/// Compares every field except `credential` (the Secret Store's concern, not
/// the audit log's) and returns the names of the ones that differ.
pub fn diff_changed_fields(old: &Config, new: &Config) -> FieldDiff {
    let mut changed = Vec::new();
    macro_rules! check {
        ($field:ident) => {
            if old.$field != new.$field {
                changed.push(stringify!($field));
            }
        };
    }
    check!(agent_id);
    check!(server_url);
    check!(heartbeat_interval_secs);
    check!(metrics_interval_secs);
    check!(collectors);
    check!(max_concurrent_commands);
    check!(command_queue_depth);
    check!(audit_enabled);
    check!(audit_rotation_mb);
    check!(audit_backup_count);
    check!(log_level);
    check!(log_format);
    changed
}

/// Result of a validation pass: every fatal and warning found, in one pass.
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    pub fatals: Vec<FatalError>,
    pub warnings: Vec<Warning>,
}

impl ValidationReport {
    pub fn is_fatal(&self) -> bool {
        !self.fatals.is_empty()
    }
}

/// Validate (and clamp in place) a [`Config`]. Returns every fatal and
/// warning found; the caller decides whether to abort startup based on
/// `report.is_fatal()`.
pub fn validate(cfg: &mut Config) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !crate::id::is_valid_identity(&cfg.agent_id) {
        report
            .fatals
            .push(FatalError::MalformedIdentity(cfg.agent_id.clone()));
    }

    match cfg.server_url.split_once("://") {
        Some(("http", _)) | Some(("https", _)) => {}
        Some(_) => report
            .fatals
            .push(FatalError::BadServerUrlScheme(cfg.server_url.clone())),
        None => report
            .fatals
            .push(FatalError::UnparsableServerUrl(cfg.server_url.clone())),
    }

    if cfg.credential.chars().any(|c| c.is_control()) {
        report.fatals.push(FatalError::CredentialControlCharacters);
    }

    cfg.heartbeat_interval_secs = clamp_u64(
        cfg.heartbeat_interval_secs,
        INTERVAL_MIN_SECS,
        INTERVAL_MAX_SECS,
        &mut report,
        Warning::HeartbeatIntervalClamped,
    );
    cfg.metrics_interval_secs = clamp_u64(
        cfg.metrics_interval_secs,
        INTERVAL_MIN_SECS,
        INTERVAL_MAX_SECS,
        &mut report,
        Warning::MetricsIntervalClamped,
    );
    cfg.max_concurrent_commands = clamp_u32(
        cfg.max_concurrent_commands,
        CONCURRENCY_MIN,
        CONCURRENCY_MAX,
        &mut report,
        Warning::ConcurrencyClamped,
    );
    cfg.command_queue_depth = clamp_u32(
        cfg.command_queue_depth,
        QUEUE_DEPTH_MIN,
        QUEUE_DEPTH_MAX,
        &mut report,
        Warning::QueueDepthClamped,
    );

    for name in &cfg.collectors {
        if !KNOWN_COLLECTORS.contains(&name.as_str()) {
            report.warnings.push(Warning::UnknownCollector(name.clone()));
        }
    }

    if !KNOWN_LOG_LEVELS.contains(&cfg.log_level.as_str()) {
        report
            .warnings
            .push(Warning::UnknownLogLevel(cfg.log_level.clone()));
        cfg.log_level = "info".to_string();
    }

    report
}

fn clamp_u64(
    value: u64,
    min: u64,
    max: u64,
    report: &mut ValidationReport,
    warn: impl FnOnce(u64) -> Warning,
) -> u64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        report.warnings.push(warn(value));
    }
    clamped
}

fn clamp_u32(
    value: u32,
    min: u32,
    max: u32,
    report: &mut ValidationReport,
    warn: impl FnOnce(u32) -> Warning,
) -> u32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        report.warnings.push(warn(value));
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_config() -> Config {
        Config {
            agent_id: uuid::Uuid::new_v4().to_string(),
            server_url: "https://rmm.example.com".to_string(),
            credential: "tok-123".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn valid_config_has_no_fatals_or_warnings() {
        let mut cfg = valid_config();
        let report = validate(&mut cfg);
        assert!(report.fatals.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn bad_scheme_is_fatal() {
        let mut cfg = valid_config();
        cfg.server_url = "ftp://example.com".to_string();
        let report = validate(&mut cfg);
        assert!(report.is_fatal());
        assert!(matches!(report.fatals[0], FatalError::BadServerUrlScheme(_)));
    }

    #[test]
    fn malformed_identity_is_fatal() {
        let mut cfg = valid_config();
        cfg.agent_id = "nope".to_string();
        let report = validate(&mut cfg);
        assert!(report.is_fatal());
    }

    #[test]
    fn control_characters_in_credential_are_fatal() {
        let mut cfg = valid_config();
        cfg.credential = "tok\n123".to_string();
        let report = validate(&mut cfg);
        assert!(report
            .fatals
            .iter()
            .any(|f| matches!(f, FatalError::CredentialControlCharacters)));
    }

    #[test]
    fn intervals_are_clamped_not_fatal() {
        let mut cfg = valid_config();
        cfg.heartbeat_interval_secs = 1;
        cfg.metrics_interval_secs = 999_999;
        let report = validate(&mut cfg);
        assert!(!report.is_fatal());
        assert_eq!(cfg.heartbeat_interval_secs, INTERVAL_MIN_SECS);
        assert_eq!(cfg.metrics_interval_secs, INTERVAL_MAX_SECS);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn concurrency_and_queue_depth_are_clamped() {
        let mut cfg = valid_config();
        cfg.max_concurrent_commands = 0;
        cfg.command_queue_depth = 50_000;
        let report = validate(&mut cfg);
        assert_eq!(cfg.max_concurrent_commands, CONCURRENCY_MIN);
        assert_eq!(cfg.command_queue_depth, QUEUE_DEPTH_MAX);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn unknown_collector_and_log_level_warn_only() {
        let mut cfg = valid_config();
        cfg.collectors = vec!["hardware".to_string(), "bogus".to_string()];
        cfg.log_level = "verbose".to_string();
        let report = validate(&mut cfg);
        assert!(!report.is_fatal());
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn diff_changed_fields_reports_only_what_actually_changed() {
        let old = valid_config();
        let mut new = old.clone();
        new.heartbeat_interval_secs += 1;
        new.log_level = "debug".to_string();
        let changed = diff_changed_fields(&old, &new);
        assert_eq!(changed, vec!["heartbeat_interval_secs", "log_level"]);
    }

    #[test]
    fn diff_changed_fields_ignores_the_credential() {
        let old = valid_config();
        let mut new = old.clone();
        new.credential = "a-completely-different-token".to_string();
        assert!(diff_changed_fields(&old, &new).is_empty());
    }

    #[test]
    fn diff_changed_fields_is_empty_for_identical_configs() {
        let cfg = valid_config();
        assert!(diff_changed_fields(&cfg, &cfg.clone()).is_empty());
    }

    proptest::proptest! {
        #[test]
        fn clamped_fields_are_always_in_range(
            heartbeat in 0u64..100_000,
            metrics in 0u64..100_000,
            concurrency in 0u32..1000,
            depth in 0u32..100_000,
        ) {
            let mut cfg = valid_config();
            cfg.heartbeat_interval_secs = heartbeat;
            cfg.metrics_interval_secs = metrics;
            cfg.max_concurrent_commands = concurrency;
            cfg.command_queue_depth = depth;
            let report = validate(&mut cfg);
            prop_assert!(!report.is_fatal());
            prop_assert!((INTERVAL_MIN_SECS..=INTERVAL_MAX_SECS).contains(&cfg.heartbeat_interval_secs));
            prop_assert!((INTERVAL_MIN_SECS..=INTERVAL_MAX_SECS).contains(&cfg.metrics_interval_secs));
            prop_assert!((CONCURRENCY_MIN..=CONCURRENCY_MAX).contains(&cfg.max_concurrent_commands));
            prop_assert!((QUEUE_DEPTH_MIN..=QUEUE_DEPTH_MAX).contains(&cfg.command_queue_depth));
        }
    }
}
