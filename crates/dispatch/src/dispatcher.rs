// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single funnel from an inbound command frame to a submitted task and,
//! eventually, exactly one result frame.

use crate::capability::{PrivilegeContext, ResultSink};
use crate::handler::MAX_COMMAND_DEADLINE;
use crate::registry::Registry;
use breeze_audit::AuditSink;
use breeze_core::{Clock, Command, CommandResult, Privilege, SchemaErrorReason};
use breeze_pool::{Task, WorkerPool};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

const PANIC_MESSAGE_LIMIT: usize = 2000;

/// Resolves a command against the registry, enforces privilege and schema,
/// submits accepted work to the pool, and delivers exactly one result per
/// command to the configured [`ResultSink`].
pub struct Dispatcher {
    registry: Arc<Registry>,
    pool: Arc<WorkerPool>,
    audit: Arc<dyn AuditSink>,
    privilege: Arc<dyn PrivilegeContext>,
    results: Arc<dyn ResultSink>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        pool: Arc<WorkerPool>,
        audit: Arc<dyn AuditSink>,
        privilege: Arc<dyn PrivilegeContext>,
        results: Arc<dyn ResultSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            pool,
            audit,
            privilege,
            results,
            clock,
        }
    }

    /// The transport's `OnCommand` target. Synchronous and non-blocking:
    /// everything past a successful submit happens on a pool worker.
    pub fn on_command(&self, cmd: Command) {
        self.audit.log("command_received", Some(&cmd.id), None);

        let Some(entry) = self.registry.resolve(&cmd.kind) else {
            self.reject(&cmd.id, "unknown command type");
            return;
        };

        // Privilege wins the tie-break over schema validation: an
        // under-privileged caller never learns which fields it got wrong.
        if entry.privilege == Privilege::Elevated && !self.privilege.is_elevated() {
            self.reject(&cmd.id, "insufficient privilege");
            return;
        }

        if let Err(err) = entry.schema.validate(&cmd.payload) {
            let reason = match err.reason {
                SchemaErrorReason::Missing => format!("missing required field '{}'", err.field),
                SchemaErrorReason::WrongType => format!("field '{}' has the wrong type", err.field),
            };
            self.reject(&cmd.id, &reason);
            return;
        }

        let handler = entry.handler.clone();
        let audit_event_type = entry.audit_event_type;
        let deadline = handler.deadline().min(MAX_COMMAND_DEADLINE);
        let command_id = cmd.id.clone();
        let payload = cmd.payload.clone();
        let audit = self.audit.clone();
        let results = self.results.clone();
        let clock = self.clock.clone();

        let task = Task::new(move |scope| async move {
            let command_scope = scope.child();
            let started_at = clock.now();

            let outcome = tokio::time::timeout(
                deadline,
                AssertUnwindSafe(handler.invoke(payload, command_scope.clone())).catch_unwind(),
            )
            .await;

            let completed_at = clock.now();
            let result = match outcome {
                Err(_elapsed) => {
                    command_scope.cancel();
                    CommandResult::timeout(&command_id, started_at, completed_at)
                }
                Ok(Err(panic)) => {
                    let message = panic_message(panic);
                    tracing::error!(command_id, error = %message, "handler panicked");
                    CommandResult::failed(&command_id, message, started_at, completed_at)
                }
                Ok(Ok(Err(error))) => CommandResult::failed(&command_id, error, started_at, completed_at),
                Ok(Ok(Ok(value))) => CommandResult::completed(&command_id, value, started_at, completed_at),
            };

            audit.log(
                audit_event_type,
                Some(&command_id),
                Some(serde_json::json!({
                    "status": result.status.as_str(),
                    "durationMs": result.duration_ms,
                })),
            );
            results.send(&result);
        });

        if !self.pool.submit(task) {
            self.reject(&cmd.id, "worker pool queue full");
        }
    }

    fn reject(&self, command_id: &str, reason: &str) {
        tracing::debug!(command_id, reason, "rejecting command");
        let now = self.clock.now();
        self.audit.log(
            "command_rejected",
            Some(command_id),
            Some(serde_json::json!({"reason": reason})),
        );
        self.results.send(&CommandResult::rejected(command_id, reason, now));
    }
}

/// Extracts a printable message from a recovered panic payload, truncated so
/// a handler that panics with a huge string can't blow up a result frame.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    };
    if message.len() > PANIC_MESSAGE_LIMIT {
        // Truncate on a char boundary: slicing at a fixed byte offset can
        // land inside a multibyte character and panic, which would escape
        // this already-panic-handling path and cost the command its result
        // frame entirely.
        let mut truncated: String = message.chars().take(PANIC_MESSAGE_LIMIT).collect();
        truncated.push_str("...(truncated)");
        truncated
    } else {
        message
    }
}
