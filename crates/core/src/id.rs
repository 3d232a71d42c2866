// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier helpers shared across the agent.

/// Truncates identifiers to a short display prefix without panicking on short input.
pub trait ShortId {
    fn short(&self, n: usize) -> &str;
}

impl ShortId for str {
    fn short(&self, n: usize) -> &str {
        if self.len() <= n {
            self
        } else {
            &self[..n]
        }
    }
}

/// Validate that a string is a plausible agent identity: either a UUID or a
/// bare hex string of at least 8 characters. The config validator uses this to
/// decide whether an identity is fatally malformed.
pub fn is_valid_identity(id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    if uuid::Uuid::parse_str(id).is_ok() {
        return true;
    }
    id.len() >= 8 && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_truncates_long_strings() {
        assert_eq!("abcdef".short(3), "abc");
        assert_eq!("ab".short(3), "ab");
    }

    #[test]
    fn identity_accepts_uuid_and_hex() {
        assert!(is_valid_identity("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_valid_identity("deadbeefcafe"));
        assert!(!is_valid_identity("not-hex-!!"));
        assert!(!is_valid_identity(""));
        assert!(!is_valid_identity("short"));
    }
}
