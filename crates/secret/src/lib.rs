// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! In-process holder for the agent's authentication credential.
//!
//! Every formatting, default-string, JSON, and text-marshal surface on
//! [`Secret`] renders `[REDACTED]`; the plaintext is reachable only through
//! the explicit [`Secret::reveal`] call. This mirrors the zeroize-backed key
//! handling used for signing keys elsewhere in the corpus (ed25519-dalek +
//! `zeroize`), adapted here to a plain credential buffer rather than a
//! keypair — see DESIGN.md.

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "[REDACTED]";

struct Inner {
    buffer: Zeroizing<Vec<u8>>,
    zeroed: bool,
    warned_since_zero: bool,
}

/// Mutex-guarded holder for a secret byte buffer. All mutating operations
/// (`zero`) are serialized through the internal mutex.
pub struct Secret {
    inner: Mutex<Inner>,
}

impl Secret {
    /// Copies `plaintext` into an internally owned, zeroize-wiped buffer.
    pub fn new(plaintext: impl AsRef<[u8]>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: Zeroizing::new(plaintext.as_ref().to_vec()),
                zeroed: false,
                warned_since_zero: false,
            }),
        }
    }

    /// Returns the plaintext bytes. Only this method exposes the secret;
    /// every formatting/serialization path returns `[REDACTED]` instead.
    pub fn reveal(&self) -> Vec<u8> {
        let mut guard = self.inner.lock();
        if guard.zeroed {
            if !guard.warned_since_zero {
                guard.warned_since_zero = true;
                tracing::warn!("Secret::reveal() called after zero(); returning empty buffer");
            }
            return Vec::new();
        }
        guard.buffer.to_vec()
    }

    /// Convenience accessor for credentials that are known to be UTF-8 text
    /// (e.g. the bearer token placed in the transport URL's query string).
    pub fn reveal_string(&self) -> String {
        String::from_utf8_lossy(&self.reveal()).into_owned()
    }

    /// Overwrites and releases the buffer. Idempotent: zeroing an
    /// already-zeroed secret is a no-op.
    pub fn zero(&self) {
        let mut guard = self.inner.lock();
        if guard.zeroed {
            return;
        }
        guard.buffer = Zeroizing::new(Vec::new());
        guard.zeroed = true;
    }

    pub fn is_zeroed(&self) -> bool {
        self.inner.lock().zeroed
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&REDACTED).finish()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED)
    }
}

/// Deserialization into [`Secret`] is forbidden: a
/// config format that round-trips through this type would risk persisting
/// `[REDACTED]` as a literal credential, or worse, accepting attacker-
/// controlled bytes as a trusted in-memory secret without going through
/// `Secret::new`.
impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(_deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Err(serde::de::Error::custom(
            "Secret cannot be deserialized; construct it explicitly via Secret::new",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_returns_plaintext() {
        let secret = Secret::new("tok-123");
        assert_eq!(secret.reveal(), b"tok-123");
        assert_eq!(secret.reveal_string(), "tok-123");
    }

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = Secret::new("tok-123");
        assert_eq!(format!("{:?}", secret), "Secret(\"[REDACTED]\")");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn json_serialization_is_redacted() {
        #[derive(Serialize)]
        struct Wrapper {
            credential: Secret,
        }
        let wrapper = Wrapper {
            credential: Secret::new("tok-123"),
        };
        let json = serde_json::to_string(&wrapper).unwrap();
        assert_eq!(json, r#"{"credential":"[REDACTED]"}"#);
    }

    #[test]
    fn deserialization_always_fails() {
        let result: Result<Secret, _> = serde_json::from_str("\"tok-123\"");
        assert!(result.is_err());
    }

    #[test]
    fn reveal_after_zero_is_empty_and_warns_once() {
        let secret = Secret::new("tok-123");
        secret.zero();
        assert!(secret.is_zeroed());
        assert_eq!(secret.reveal(), Vec::<u8>::new());
        assert_eq!(secret.reveal(), Vec::<u8>::new());
    }

    #[test]
    fn zero_is_idempotent() {
        let secret = Secret::new("tok-123");
        secret.zero();
        secret.zero();
        assert!(secret.is_zeroed());
    }
}
