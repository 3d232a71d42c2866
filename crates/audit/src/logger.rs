// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only, hash-chained file sink.
//!
//! The on-open recovery scan and the rename-based rotation dance mirror the
//! teacher's write-ahead log: scan to find where the chain left off, rotate
//! by shifting numbered backups and renaming the active file into `.1`, and
//! never mutate a file in place.

use crate::entry::{AuditEntry, GENESIS};
use crate::sink::AuditSink;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Event types whose durability is worth an explicit `fsync` on every write,
/// rather than trusting the OS write-back cache.
const CRITICAL_EVENT_TYPES: &[&str] = &[
    "agent_start",
    "agent_stop",
    "config_change",
    "privileged_operation",
    "log_rotated",
];

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("io error opening audit log at {path}: {source}")]
    Open { path: PathBuf, source: std::io::Error },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

struct State {
    file: File,
    prev_hash: String,
    written_bytes: u64,
}

/// Durable, rotating, hash-chained audit sink.
pub struct FileAuditLogger {
    path: PathBuf,
    max_bytes: u64,
    backup_count: u32,
    state: Mutex<State>,
    dropped: AtomicU64,
}

impl FileAuditLogger {
    pub fn open(path: &Path, max_bytes: u64, backup_count: u32) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|source| AuditError::Open {
                path: path.to_owned(),
                source,
            })?;
        set_owner_only(&file)?;

        let prev_hash = last_entry_hash(path)?.unwrap_or_else(|| GENESIS.to_string());
        let written_bytes = file.metadata()?.len();

        Ok(Self {
            path: path.to_owned(),
            max_bytes,
            backup_count,
            state: Mutex::new(State {
                file,
                prev_hash,
                written_bytes,
            }),
            dropped: AtomicU64::new(0),
        })
    }

    fn write_locked(
        &self,
        state: &mut State,
        event_type: &str,
        command_id: Option<&str>,
        details: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<AuditEntry, AuditError> {
        let entry = AuditEntry::new(
            now,
            event_type,
            command_id.map(|s| s.to_string()),
            details,
            state.prev_hash.clone(),
        );
        let mut line = serde_json::to_vec(&entry).unwrap_or_default();
        line.push(b'\n');
        state.file.write_all(&line)?;
        if CRITICAL_EVENT_TYPES.contains(&event_type) {
            state.file.sync_all()?;
        }
        state.written_bytes += line.len() as u64;
        state.prev_hash = entry.entry_hash.clone();
        Ok(entry)
    }

    fn rotate_locked(&self, state: &mut State, now: DateTime<Utc>) -> Result<(), AuditError> {
        state.file.sync_all()?;

        if self.backup_count > 0 {
            let oldest = backup_path(&self.path, self.backup_count);
            if oldest.exists() {
                std::fs::remove_file(&oldest)?;
            }
            for i in (1..self.backup_count).rev() {
                let from = backup_path(&self.path, i);
                if from.exists() {
                    std::fs::rename(&from, backup_path(&self.path, i + 1))?;
                }
            }
            std::fs::rename(&self.path, backup_path(&self.path, 1))?;
        } else {
            std::fs::remove_file(&self.path)?;
        }

        let new_file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        set_owner_only(&new_file)?;
        state.file = new_file;
        state.written_bytes = 0;

        let previous_file = backup_path(&self.path, 1);
        self.write_locked(
            state,
            "log_rotated",
            None,
            Some(serde_json::json!({ "previousFile": previous_file.display().to_string() })),
            now,
        )?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditLogger {
    fn log(&self, event_type: &str, command_id: Option<&str>, details: Option<serde_json::Value>) {
        let now = Utc::now();
        let mut state = self.state.lock();

        // Serialize against the chain as it stands now to get the record's
        // real on-disk length. If rotation below changes `prev_hash`, this
        // candidate is stale and discarded; `write_locked` builds the entry
        // actually written with whatever `prev_hash` is current by then.
        let candidate = AuditEntry::new(
            now,
            event_type,
            command_id.map(|s| s.to_string()),
            details.clone(),
            state.prev_hash.clone(),
        );
        let projected_len = serde_json::to_vec(&candidate).map(|v| v.len() as u64 + 1).unwrap_or(0);
        if self.max_bytes > 0 && state.written_bytes + projected_len > self.max_bytes {
            if let Err(err) = self.rotate_locked(&mut state, now) {
                tracing::error!(error = %err, path = %self.path.display(), "audit log rotation failed");
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        if let Err(err) = self.write_locked(&mut state, event_type, command_id, details, now) {
            tracing::error!(error = %err, path = %self.path.display(), "audit log write failed");
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn close(&self) {
        let state = self.state.lock();
        let _ = state.file.sync_all();
    }
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

#[cfg(unix)]
fn set_owner_only(file: &File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = file.metadata()?.permissions();
    perms.set_mode(0o600);
    file.set_permissions(perms)
}

#[cfg(not(unix))]
fn set_owner_only(_file: &File) -> std::io::Result<()> {
    Ok(())
}

/// Scans an existing log for the hash of its last well-formed entry, so a
/// reopened logger resumes the chain instead of restarting it. Returns
/// `Ok(None)` for an empty or nonexistent file; a trailing corrupt line is
/// ignored rather than treated as fatal, matching the last-good-entry
/// recovery the write-ahead log uses for its own scan.
fn last_entry_hash(path: &Path) -> Result<Option<String>, AuditError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let reader = BufReader::new(file);
    let mut last = None;
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(trimmed) {
            Ok(entry) => last = Some(entry.entry_hash),
            Err(_) => break,
        }
    }
    Ok(last)
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
