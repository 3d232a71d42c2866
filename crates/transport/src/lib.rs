// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The persistent server connection: WebSocket session lifecycle, reconnect
//! with jittered backoff, liveness ping/pong, frame demux, and bounded send
//! queues.

mod backoff;
mod frame;
mod session;
mod url;

pub use backoff::{Backoff, BackoffRng, ThreadRngBackoff};
pub use frame::{
    classify_inbound, encode_binary_frame, encode_result_frame, encode_stream_frame, InboundFrame,
    RawInboundFrame, TransportError, SESSION_ID_LEN,
};
pub use session::{OnCommand, Session, SessionConfig};
pub use url::{build_ws_url, redact_token, UrlError};
