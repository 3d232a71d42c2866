// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound/outbound frame shapes and the binary frame's fixed-offset wire
//! format.

use breeze_core::{Command, CommandResult};
use serde::Deserialize;
use thiserror::Error;

/// The fixed width of the ASCII session id carried in every binary frame.
pub const SESSION_ID_LEN: usize = 36;

const BINARY_FRAME_MARKER: u8 = 0x02;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("queue is full")]
    QueueFull,
    #[error("session id must be exactly {SESSION_ID_LEN} bytes, got {0}")]
    InvalidSessionId(usize),
    #[error("transport is stopped")]
    Stopped,
}

/// An inbound frame, before it is classified as control or command.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// An inbound frame classified per the transport contract: control frames
/// carry no usable `id` and are ignored by dispatch; command frames carry
/// both `id` and `type` and are handed to the dispatcher.
pub enum InboundFrame {
    Control { kind: String },
    Command(Command),
}

pub fn classify_inbound(raw: RawInboundFrame) -> InboundFrame {
    match raw.id {
        Some(id) if !id.is_empty() => InboundFrame::Command(Command {
            id,
            kind: raw.kind,
            payload: raw.payload,
        }),
        _ => InboundFrame::Control { kind: raw.kind },
    }
}

/// Builds the outbound `command_result` text frame.
pub fn encode_result_frame(result: &CommandResult) -> serde_json::Value {
    serde_json::json!({
        "type": "command_result",
        "commandId": result.command_id,
        "status": result.status,
        "result": result.result,
        "error": result.error,
    })
}

/// Builds the opaque binary frame: `0x02 || 36-byte session id || payload`.
pub fn encode_binary_frame(session_id: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    if session_id.len() != SESSION_ID_LEN {
        return Err(TransportError::InvalidSessionId(session_id.len()));
    }
    let mut frame = Vec::with_capacity(1 + SESSION_ID_LEN + payload.len());
    frame.push(BINARY_FRAME_MARKER);
    frame.extend_from_slice(session_id.as_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Builds the structured text frame used for streamed command I/O.
pub fn encode_stream_frame(session_id: &str, data: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "type": "stream",
        "sessionId": session_id,
        "data": data,
    })
}
