// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator: composes every subsystem in the startup order and tears
//! them down again in the shutdown order. Acquires the PID lock before
//! anything durable is touched, skips cleanup on a lock conflict (those
//! files belong to the already-running daemon), and never lets one shutdown
//! step's failure skip the rest.

use crate::config_loader::{self, ConfigLoadError};
use crate::handlers::{Ping, RunScript};
use crate::logging::{self, LoggingGuard};
use crate::paths::Paths;
use crate::result_sink::DeferredResultSink;
use breeze_audit::{AuditSink, FileAuditLogger, NullAuditSink};
use breeze_core::{diff_changed_fields, Clock, Command, Config, FieldType, PayloadSchema, Privilege, SystemClock};
use breeze_dispatch::{Dispatcher, HandlerEntry, Registry, StaticPrivilege};
use breeze_health::HealthMonitor;
use breeze_platform::Platform;
use breeze_pool::WorkerPool;
use breeze_secret::Secret;
use breeze_transport::{build_ws_url, redact_token, OnCommand, Session, SessionConfig};
use parking_lot::Mutex as SyncMutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

/// Deadline the pool is given to drain in-flight commands before shutdown
/// gives up waiting and cancels every remaining task's scope.
const DRAIN_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to determine data directory: {0}")]
    Platform(#[from] breeze_platform::PlatformError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigLoadError),
    #[error("another instance is already running: {0}")]
    LockHeld(std::io::Error),
    #[error("failed to initialize logging: {0}")]
    Logging(std::io::Error),
    #[error("failed to build server url: {0}")]
    Url(#[from] breeze_transport::UrlError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lets an external caller (a signal handler, the CLI's `stop` subcommand)
/// ask a running [`Orchestrator::run`] to shut down, or to reload its
/// configuration in place, without owning it.
#[derive(Clone)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
    reload_requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Requests a configuration reload (the SIGHUP path). Unlike
    /// `request_stop`, this never tears anything down — `Orchestrator::run`
    /// picks it up, re-reads the config file, and keeps running.
    pub fn request_reload(&self) {
        self.reload_requested.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}

/// Owns every long-lived subsystem handle for the process's lifetime. Built
/// once by [`Orchestrator::start`]; consumed by [`Orchestrator::run`].
pub struct Orchestrator {
    _lock_file: File,
    _logging_guard: LoggingGuard,
    paths: Paths,
    audit: Arc<dyn AuditSink>,
    secret: Arc<Secret>,
    health: Arc<HealthMonitor>,
    pool: Arc<WorkerPool>,
    session: Arc<Session>,
    stop: StopHandle,
    /// The last configuration reloaded into this process, credential already
    /// blanked. Compared against the next reload to produce a `config_change`
    /// audit diff.
    config_snapshot: SyncMutex<Config>,
}

impl Orchestrator {
    /// Runs the full startup order against the platform's data directory.
    /// `config_override`, if given, replaces the platform-default config
    /// path (the `breeze-agent run --config PATH` case); the PID lock,
    /// audit log, and log file still live under the platform data directory
    /// regardless.
    pub async fn start(
        platform: Arc<dyn Platform>,
        config_override: Option<std::path::PathBuf>,
    ) -> Result<Self, LifecycleError> {
        let mut paths = Paths::under(platform.as_ref())?;
        std::fs::create_dir_all(&paths.root)?;
        if let Some(override_path) = config_override {
            paths.config_path = override_path;
        }

        // 1. Acquire the PID lock before anything durable is touched — a
        // losing second instance must never race the first for the audit
        // log or the config file.
        let lock_file = acquire_lock(&paths)?;

        // 2. Load and validate configuration.
        let (mut config, report) = config_loader::load(&paths.config_path)?;
        for warning in &report.warnings {
            tracing::warn!(%warning, "configuration warning");
        }

        // 3. Initialize logging.
        let logging_guard =
            logging::init(&paths.log_path, &config.log_level, config.log_format).map_err(LifecycleError::Logging)?;
        tracing::info!(agent_id = %config.agent_id, "starting");

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let health = Arc::new(HealthMonitor::new(clock.clone()));

        // 4. Audit logger. A failure here is degraded, not fatal: the agent
        // still comes up and reports the degradation through health, rather
        // than refusing to start because it can't write its own receipts.
        let audit: Arc<dyn AuditSink> = if config.audit_enabled {
            match FileAuditLogger::open(
                &paths.audit_path,
                config.audit_rotation_mb * 1024 * 1024,
                config.audit_backup_count,
            ) {
                Ok(logger) => {
                    health.update("audit", "healthy", "audit log open");
                    Arc::new(logger)
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to open audit log; continuing without durable audit");
                    health.update("audit", "degraded", err.to_string());
                    Arc::new(NullAuditSink)
                }
            }
        } else {
            Arc::new(NullAuditSink)
        };

        // 5. Secret Store: move the plaintext credential out of the config
        // record and blank it there immediately.
        let secret = Arc::new(Secret::new(config.credential.as_bytes()));
        config.credential.clear();

        // 6. Worker pool.
        let pool = Arc::new(WorkerPool::new(
            config.max_concurrent_commands as usize,
            config.command_queue_depth as usize,
        ));

        // 7. Registry + Dispatcher. Whether the process holds the host's
        // elevated privilege is read from how it was launched: a process a
        // service manager started runs with the privilege the service unit
        // was granted, which on every supported platform is elevated.
        let privilege = Arc::new(StaticPrivilege(platform.is_service_mode()));
        let registry = Arc::new(build_registry(platform.clone()));
        let results = Arc::new(DeferredResultSink::new());
        let dispatcher = Arc::new(Dispatcher::new(
            registry,
            pool.clone(),
            audit.clone(),
            privilege,
            results.clone(),
            clock.clone(),
        ));

        // 8. Transport Session, wired to the dispatcher's `on_command`.
        let ws_url = build_ws_url(&config.server_url, &config.agent_id, &secret.reveal_string())?;
        tracing::info!(url = %redact_token(&ws_url), "connecting");
        let session_config = SessionConfig::new(ws_url);
        let on_command: OnCommand = {
            let dispatcher = dispatcher.clone();
            Arc::new(move |cmd: Command| dispatcher.on_command(cmd))
        };
        let session = Arc::new(Session::start(session_config, on_command));
        results.bind(session.clone());
        health.update("transport", "healthy", "session started");

        // 9. Emit the startup audit event last, once every subsystem it
        // would reference is live.
        audit.log("agent_start", None, Some(serde_json::json!({"agentId": config.agent_id})));

        Ok(Self {
            _lock_file: lock_file,
            _logging_guard: logging_guard,
            paths,
            audit,
            secret,
            health,
            pool,
            session,
            stop: StopHandle {
                requested: Arc::new(AtomicBool::new(false)),
                reload_requested: Arc::new(AtomicBool::new(false)),
                notify: Arc::new(Notify::new()),
            },
            config_snapshot: SyncMutex::new(config),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn health(&self) -> Arc<HealthMonitor> {
        self.health.clone()
    }

    /// Blocks until `stop_handle().request_stop()` is called, servicing any
    /// number of `request_reload()`s along the way, then runs the shutdown
    /// sequence. Best-effort past the first shutdown step: every failure is
    /// logged and shutdown proceeds to the next step regardless.
    pub async fn run(self) -> Result<(), LifecycleError> {
        loop {
            if self.stop.requested.load(Ordering::Acquire) {
                break;
            }
            if self.stop.reload_requested.swap(false, Ordering::AcqRel) {
                self.reload_config().await;
                continue;
            }
            self.stop.notify.notified().await;
        }
        self.shutdown().await
    }

    /// Re-reads the config file and, if anything changed, emits a
    /// `config_change` audit entry naming which fields moved (never their
    /// values — the Secret Store, not the audit log, is where a credential
    /// lives). A reload that fails to load or validate is logged and
    /// discarded: the process keeps running on its last-known-good config
    /// rather than going down over a bad edit to the file on disk.
    async fn reload_config(&self) {
        let (mut reloaded, report) = match config_loader::load(&self.paths.config_path) {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::error!(error = %err, "config reload failed; keeping the running configuration");
                return;
            }
        };
        for warning in &report.warnings {
            tracing::warn!(%warning, "configuration warning on reload");
        }
        reloaded.credential.clear();

        let mut snapshot = self.config_snapshot.lock();
        let changed = diff_changed_fields(&snapshot, &reloaded);
        if changed.is_empty() {
            tracing::info!("config reload observed no changes");
            return;
        }

        tracing::info!(?changed, "configuration reloaded");
        self.audit.log("config_change", None, Some(serde_json::json!({"changedFields": changed})));
        *snapshot = reloaded;
    }

    async fn shutdown(self) -> Result<(), LifecycleError> {
        tracing::info!("shutting down");

        // (a) Signal the transport to close, stopping new command intake.
        self.session.stop_and_wait().await;

        // (b)+(c) Stop accepting new tasks and drain in-flight ones.
        if self.pool.drain(DRAIN_DEADLINE).await.is_err() {
            tracing::warn!("worker pool drain deadline exceeded; remaining tasks were cancelled");
        }

        // (d) In-flight handler-registered work is joined by the drain
        // above: every submitted task runs to completion or observes its
        // scope's cancellation inside the pool's own `drain`.

        // (e) Emit the stop event before the logger it's written through
        // closes.
        self.audit.log(
            "agent_stop",
            None,
            Some(serde_json::json!({"droppedAuditEntries": self.audit.dropped_count()})),
        );

        // (f) Close the audit logger.
        self.audit.close();

        // (g) Wipe the Secret Store.
        self.secret.zero();

        tracing::info!(data_dir = %self.paths.root.display(), "shutdown complete");
        Ok(())
    }
}

fn build_registry(platform: Arc<dyn Platform>) -> Registry {
    Registry::new()
        .with(HandlerEntry::new(
            "ping",
            Privilege::Standard,
            PayloadSchema::default(),
            Arc::new(Ping),
        ))
        .with(
            HandlerEntry::new(
                "run_script",
                Privilege::Elevated,
                PayloadSchema {
                    required: vec![("script", FieldType::String)],
                },
                Arc::new(RunScript::new(platform)),
            )
            .with_audit_event_type("script_execution"),
        )
}

fn acquire_lock(paths: &Paths) -> Result<File, LifecycleError> {
    use fs2::FileExt;

    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockHeld)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use breeze_platform::PlatformError;
    use std::path::PathBuf;

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
    fn registry_resolves_the_built_in_handlers() {
        let registry = build_registry(Arc::new(FakePlatform(PathBuf::from("/tmp"))));
        assert!(registry.resolve("ping").is_some());
        assert!(registry.resolve("run_script").is_some());
        assert_eq!(registry.resolve("run_script").unwrap().privilege, Privilege::Elevated);
    }

    #[test]
    fn second_lock_attempt_on_the_same_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::under(&FakePlatform(dir.path().to_path_buf())).unwrap();
        let _first = acquire_lock(&paths).unwrap();
        assert!(acquire_lock(&paths).is_err());
    }
}
