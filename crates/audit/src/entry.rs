// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hash-chained audit record written to disk.

use breeze_core::length_prefixed;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sentinel `prevHash` for the first entry ever written to a fresh log.
pub const GENESIS: &str = "genesis";

/// One hash-chained line in the audit log.
///
/// Field order here is the wire order; it must not be reordered without also
/// updating every consumer that recomputes `entry_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "commandId", skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(rename = "prevHash")]
    pub prev_hash: String,
    #[serde(rename = "entryHash")]
    pub entry_hash: String,
}

impl AuditEntry {
    /// Builds a new entry chained onto `prev_hash` and computes its own hash.
    pub fn new(
        timestamp: DateTime<Utc>,
        event_type: impl Into<String>,
        command_id: Option<String>,
        details: Option<serde_json::Value>,
        prev_hash: impl Into<String>,
    ) -> Self {
        let event_type = event_type.into();
        let prev_hash = prev_hash.into();
        let entry_hash = compute_hash(timestamp, &event_type, &command_id, &details, &prev_hash);
        Self {
            timestamp,
            event_type,
            command_id,
            details,
            prev_hash,
            entry_hash,
        }
    }

    /// Recomputes `entry_hash` from the entry's own fields, for chain
    /// verification independent of whatever is stored in `self.entry_hash`.
    pub fn recompute_hash(&self) -> String {
        compute_hash(
            self.timestamp,
            &self.event_type,
            &self.command_id,
            &self.details,
            &self.prev_hash,
        )
    }
}

/// `SHA-256(len-prefixed(timestamp) || len-prefixed(eventType) || len-prefixed(commandId)
///   || len-prefixed(prevHash) || len-prefixed(canonical-json(details)))`.
///
/// `details` is serialized through `serde_json`'s default (BTreeMap-backed,
/// key-sorted) `Value::Object`, so the same details always canonicalize to
/// the same bytes regardless of insertion order.
fn compute_hash(
    timestamp: DateTime<Utc>,
    event_type: &str,
    command_id: &Option<String>,
    details: &Option<serde_json::Value>,
    prev_hash: &str,
) -> String {
    let canonical_details = match details {
        Some(value) => serde_json::to_string(value).unwrap_or_default(),
        None => String::new(),
    };
    let mut hasher = Sha256::new();
    hasher.update(length_prefixed(&timestamp.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)));
    hasher.update(length_prefixed(event_type));
    hasher.update(length_prefixed(command_id.as_deref().unwrap_or("")));
    hasher.update(length_prefixed(prev_hash));
    hasher.update(length_prefixed(&canonical_details));
    hex::encode(hasher.finalize())
}
