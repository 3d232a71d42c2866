// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness probe a server can send to confirm the dispatch path is alive
//! end to end, independent of transport-level ping/pong.

use async_trait::async_trait;
use breeze_dispatch::CommandHandler;
use breeze_pool::CancellationScope;

pub struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn invoke(
        &self,
        _payload: serde_json::Map<String, serde_json::Value>,
        _scope: CancellationScope,
    ) -> Result<serde_json::Value, String> {
        Ok(serde_json::json!({ "pong": true }))
    }
}
