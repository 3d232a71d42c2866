// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

/// Overrides the `breezed` binary path this crate execs for `run`/`service
/// start`, instead of searching relative to the currently-running executable.
pub fn daemon_binary() -> Option<String> {
    std::env::var("BREEZE_DAEMON_BINARY").ok()
}
