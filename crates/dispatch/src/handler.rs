// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A handler invoked by the dispatcher for a single command type, and the
//! registry record that ties it to a privilege requirement and schema.

use async_trait::async_trait;
use breeze_core::{PayloadSchema, Privilege};
use breeze_pool::CancellationScope;
use std::sync::Arc;
use std::time::Duration;

/// Deadline applied when a handler doesn't declare its own.
pub const DEFAULT_COMMAND_DEADLINE: Duration = Duration::from_secs(300);

/// Hard ceiling on any handler-declared deadline.
pub const MAX_COMMAND_DEADLINE: Duration = Duration::from_secs(3600);

/// The unit of work a registry entry runs. `invoke` returns `Err` for a
/// handler-reported failure (becomes a `failed` result); a panic inside
/// `invoke` is recovered by the dispatcher, not by the handler itself.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Per-invocation deadline, capped by the dispatcher at
    /// [`MAX_COMMAND_DEADLINE`] regardless of what's returned here.
    fn deadline(&self) -> Duration {
        DEFAULT_COMMAND_DEADLINE
    }

    async fn invoke(
        &self,
        payload: serde_json::Map<String, serde_json::Value>,
        scope: CancellationScope,
    ) -> Result<serde_json::Value, String>;
}

/// A registry record unifying a command type with its privilege
/// requirement, payload schema, and the handler that runs it.
pub struct HandlerEntry {
    pub command_type: &'static str,
    pub privilege: Privilege,
    pub schema: PayloadSchema,
    pub audit_event_type: &'static str,
    pub handler: Arc<dyn CommandHandler>,
}

impl HandlerEntry {
    pub fn new(
        command_type: &'static str,
        privilege: Privilege,
        schema: PayloadSchema,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            command_type,
            privilege,
            schema,
            audit_event_type: "command_executed",
            handler,
        }
    }

    /// Overrides the audit event type emitted on completion (e.g.
    /// `script_execution` for a handler that shells out).
    pub fn with_audit_event_type(mut self, audit_event_type: &'static str) -> Self {
        self.audit_event_type = audit_event_type;
        self
    }
}
