// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection URL derivation: server base URL to WebSocket endpoint.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid base url: {0}")]
    Parse(String),
    #[error("unsupported url scheme {0:?}: must be http or https")]
    UnsupportedScheme(String),
}

/// Builds the agent's WebSocket endpoint from its HTTP(S) base URL, mapping
/// `https -> wss` / `http -> ws`, appending the session path, and placing
/// the credential in the `token` query parameter. The credential is only
/// revealed here, at the moment the URL is built; the resulting `Url` must
/// never be logged verbatim.
pub fn build_ws_url(base_url: &str, agent_id: &str, token: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(base_url).map_err(|err| UrlError::Parse(err.to_string()))?;

    let ws_scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(UrlError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(ws_scheme)
        .map_err(|()| UrlError::Parse("failed to rewrite url scheme".to_string()))?;

    let trimmed = url.path().trim_end_matches('/');
    url.set_path(&format!("{trimmed}/api/v1/agent-ws/{agent_id}/ws"));
    url.query_pairs_mut().append_pair("token", token);

    Ok(url)
}

/// Renders a URL with its `token` query parameter masked, safe to include in
/// logs.
pub fn redact_token(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = redacted
        .query_pairs()
        .map(|(k, v)| {
            if k == "token" {
                (k.into_owned(), "[REDACTED]".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
