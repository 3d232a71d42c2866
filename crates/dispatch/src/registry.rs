// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The static command-type registry the dispatcher resolves every inbound
//! command against.

use crate::handler::HandlerEntry;
use std::collections::HashMap;

#[derive(Default)]
pub struct Registry {
    entries: HashMap<&'static str, HandlerEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: HandlerEntry) {
        self.entries.insert(entry.command_type, entry);
    }

    pub fn with(mut self, entry: HandlerEntry) -> Self {
        self.register(entry);
        self
    }

    pub fn resolve(&self, command_type: &str) -> Option<&HandlerEntry> {
        self.entries.get(command_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use breeze_core::{FieldType, PayloadSchema, Privilege};
    use breeze_pool::CancellationScope;
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl crate::handler::CommandHandler for Noop {
        async fn invoke(
            &self,
            _payload: serde_json::Map<String, serde_json::Value>,
            _scope: CancellationScope,
        ) -> Result<serde_json::Value, String> {
            Ok(serde_json::json!({}))
        }
    }

    #[test]
    fn resolves_a_registered_command_type() {
        let registry = Registry::new().with(HandlerEntry::new(
            "ping",
            Privilege::Standard,
            PayloadSchema::default(),
            Arc::new(Noop),
        ));
        assert!(registry.resolve("ping").is_some());
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn last_registration_for_a_type_wins() {
        let mut registry = Registry::new();
        registry.register(HandlerEntry::new(
            "run_script",
            Privilege::Standard,
            PayloadSchema::default(),
            Arc::new(Noop),
        ));
        registry.register(HandlerEntry::new(
            "run_script",
            Privilege::Elevated,
            PayloadSchema {
                required: vec![("path", FieldType::String)],
            },
            Arc::new(Noop),
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("run_script").unwrap().privilege, Privilege::Elevated);
    }
}
