// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The command dispatcher: resolves an inbound command against a static
//! registry, enforces privilege and payload schema, submits accepted work to
//! a worker pool, and guarantees exactly one result per command.

mod capability;
mod dispatcher;
mod handler;
mod registry;

pub use capability::{PrivilegeContext, ResultSink, StaticPrivilege};
pub use dispatcher::Dispatcher;
pub use handler::{CommandHandler, HandlerEntry, DEFAULT_COMMAND_DEADLINE, MAX_COMMAND_DEADLINE};
pub use registry::Registry;

#[cfg(any(test, feature = "test-support"))]
pub use capability::test_support;
