// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges the dispatcher's [`ResultSink`] capability to a live transport
//! session. Lives here rather than in `breeze-dispatch` or `breeze-transport`
//! because neither of those crates depends on the other, and the dispatcher
//! must be constructed before the session it will eventually be wired to
//! (the session's `OnCommand` callback closes over the dispatcher).

use breeze_core::CommandResult;
use breeze_dispatch::ResultSink;
use breeze_transport::Session;
use std::sync::{Arc, OnceLock};

/// A [`ResultSink`] that starts out empty and is bound to the real session
/// once it exists. A result delivered before `bind` is called (impossible in
/// practice: no inbound command can reach the dispatcher before the session
/// that receives it has been constructed) is logged and dropped rather than
/// panicking.
#[derive(Default, Clone)]
pub struct DeferredResultSink {
    session: Arc<OnceLock<Arc<Session>>>,
}

impl DeferredResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, session: Arc<Session>) {
        let _ = self.session.set(session);
    }
}

impl ResultSink for DeferredResultSink {
    fn send(&self, result: &CommandResult) {
        match self.session.get() {
            Some(session) => {
                if let Err(err) = session.send_result(result) {
                    tracing::warn!(command_id = %result.command_id, error = %err, "failed to send command result");
                }
            }
            None => {
                tracing::error!(command_id = %result.command_id, "dropping command result: session not yet bound");
            }
        }
    }
}
