// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command and command-result records exchanged between the transport
//! session and the command dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of work received from the server. Created on receive, destroyed
/// after its result is submitted or it is rejected before being handed off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Command {
    /// An inbound frame is dispatchable only when both `id` and `type` are
    /// non-empty.
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && !self.kind.is_empty()
    }
}

/// Terminal outcome of a command's lifecycle:
/// `received → validated → queued → running → (completed | failed | rejected | timeout) → reported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Completed,
    Failed,
    Rejected,
    Timeout,
}

impl CommandStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandStatus::Completed => "completed",
            CommandStatus::Failed => "failed",
            CommandStatus::Rejected => "rejected",
            CommandStatus::Timeout => "timeout",
        }
    }
}

/// One result frame per accepted (or rejected) command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub command_id: String,
    pub status: CommandStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl CommandResult {
    pub fn rejected(command_id: impl Into<String>, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            command_id: command_id.into(),
            status: CommandStatus::Rejected,
            result: None,
            error: Some(reason.into()),
            started_at: now,
            completed_at: now,
            duration_ms: 0,
        }
    }

    pub fn completed(
        command_id: impl Into<String>,
        result: serde_json::Value,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let duration_ms = duration_ms(started_at, completed_at);
        Self {
            command_id: command_id.into(),
            status: CommandStatus::Completed,
            result: Some(result),
            error: None,
            started_at,
            completed_at,
            duration_ms,
        }
    }

    pub fn failed(
        command_id: impl Into<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let duration_ms = duration_ms(started_at, completed_at);
        Self {
            command_id: command_id.into(),
            status: CommandStatus::Failed,
            result: None,
            error: Some(error.into()),
            started_at,
            completed_at,
            duration_ms,
        }
    }

    pub fn timeout(command_id: impl Into<String>, started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        let duration_ms = duration_ms(started_at, completed_at);
        Self {
            command_id: command_id.into(),
            status: CommandStatus::Timeout,
            result: None,
            error: Some("command deadline exceeded".to_string()),
            started_at,
            completed_at,
            duration_ms,
        }
    }
}

fn duration_ms(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> u64 {
    (completed_at - started_at).num_milliseconds().max(0) as u64
}

/// Privilege classes a handler may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    /// Any caller may invoke this command.
    Standard,
    /// Requires the agent process to hold the host's elevated privilege.
    Elevated,
}

/// A handler-declared payload schema: required keys and their expected JSON type.
#[derive(Debug, Clone, Default)]
pub struct PayloadSchema {
    pub required: Vec<(&'static str, FieldType)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Bool,
    Object,
    Array,
}

impl FieldType {
    fn matches(self, value: &serde_json::Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
        }
    }
}

/// Error identifying exactly which required field was missing or mistyped,
/// so the dispatcher can report a structured rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub field: String,
    pub reason: SchemaErrorReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorReason {
    Missing,
    WrongType,
}

impl PayloadSchema {
    pub fn validate(
        &self,
        payload: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), SchemaError> {
        for (field, expected) in &self.required {
            match payload.get(*field) {
                None => {
                    return Err(SchemaError {
                        field: (*field).to_string(),
                        reason: SchemaErrorReason::Missing,
                    })
                }
                Some(value) if !expected.matches(value) => {
                    return Err(SchemaError {
                        field: (*field).to_string(),
                        reason: SchemaErrorReason::WrongType,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_requires_id_and_type() {
        let mut cmd = Command {
            id: "c1".into(),
            kind: "ping".into(),
            payload: Default::default(),
        };
        assert!(cmd.is_well_formed());
        cmd.id.clear();
        assert!(!cmd.is_well_formed());
    }

    #[test]
    fn schema_reports_missing_field() {
        let schema = PayloadSchema {
            required: vec![("path", FieldType::String)],
        };
        let payload = serde_json::Map::new();
        let err = schema.validate(&payload).unwrap_err();
        assert_eq!(err.field, "path");
        assert_eq!(err.reason, SchemaErrorReason::Missing);
    }

    #[test]
    fn schema_reports_wrong_type() {
        let schema = PayloadSchema {
            required: vec![("count", FieldType::Number)],
        };
        let mut payload = serde_json::Map::new();
        payload.insert("count".into(), serde_json::Value::String("nope".into()));
        let err = schema.validate(&payload).unwrap_err();
        assert_eq!(err.reason, SchemaErrorReason::WrongType);
    }

    #[test]
    fn result_duration_is_nonnegative() {
        let t = Utc::now();
        let r = CommandResult::completed("c1", serde_json::json!({"ok": true}), t, t);
        assert_eq!(r.duration_ms, 0);
    }
}
