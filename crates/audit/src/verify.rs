// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offline verification of a single log file's hash chain.

use crate::entry::AuditEntry;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainDefect {
    #[error("line {0}: entryHash does not match the entry's own fields")]
    HashMismatch(usize),
    #[error("line {0}: prevHash does not match the preceding entry's entryHash")]
    ChainBroken(usize),
    #[error("line {0}: not valid JSON")]
    Unparsable(usize),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChainReport {
    pub entries_checked: usize,
    pub defects: Vec<ChainDefect>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.defects.is_empty()
    }
}

/// Reads `path` line by line and checks that every entry's stored
/// `entryHash` matches its own fields, and that every entry's `prevHash`
/// matches the previous entry's `entryHash`. The first line's `prevHash` is
/// not checked against anything external (it may legitimately be `genesis`
/// or the last hash carried over from a rotated-out file).
pub fn verify_chain(path: &Path) -> std::io::Result<ChainReport> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut report = ChainReport::default();
    let mut previous: Option<AuditEntry> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry: AuditEntry = match serde_json::from_str(trimmed) {
            Ok(e) => e,
            Err(_) => {
                report.defects.push(ChainDefect::Unparsable(line_no));
                continue;
            }
        };
        report.entries_checked += 1;

        if entry.entry_hash != entry.recompute_hash() {
            report.defects.push(ChainDefect::HashMismatch(line_no));
        }
        if let Some(prev) = &previous {
            if entry.prev_hash != prev.entry_hash {
                report.defects.push(ChainDefect::ChainBroken(line_no));
            }
        }
        previous = Some(entry);
    }

    Ok(report)
}
