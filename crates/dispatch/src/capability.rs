// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Narrow capability traits the dispatcher depends on instead of concrete
//! types from sibling crates, so it stays testable without a live transport
//! session or a real OS privilege check.

use breeze_core::CommandResult;

/// Whether the process holds the host's elevated privilege. Checked once per
/// command against a handler's declared [`breeze_core::Privilege`].
pub trait PrivilegeContext: Send + Sync {
    fn is_elevated(&self) -> bool;
}

/// A fixed answer, set once at startup from how the process was launched.
pub struct StaticPrivilege(pub bool);

impl PrivilegeContext for StaticPrivilege {
    fn is_elevated(&self) -> bool {
        self.0
    }
}

/// Where a finished (or rejected) command result is delivered. Implemented
/// by the transport session in the running agent; send failures are the
/// sink's own concern, never the dispatcher's.
pub trait ResultSink: Send + Sync {
    fn send(&self, result: &CommandResult);
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every result it receives, for assertions in dispatcher tests.
    #[derive(Default, Clone)]
    pub struct RecordingResultSink {
        results: Arc<Mutex<Vec<CommandResult>>>,
    }

    impl RecordingResultSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn results(&self) -> Vec<CommandResult> {
            self.results.lock().clone()
        }
    }

    impl ResultSink for RecordingResultSink {
        fn send(&self, result: &CommandResult) {
            self.results.lock().push(result.clone());
        }
    }
}
