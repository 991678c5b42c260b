// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential lifecycle for the Chatwire API.
//!
//! One process manages one active identity. The [`manager::CredentialManager`]
//! owns the cached credential, picks an acquisition strategy from
//! configuration, and coordinates the [`store`] and [`scheduler`]; every
//! outbound request reads the cache synchronously through it.

pub mod browser;
pub mod challenge;
pub mod exchange;
pub mod handshake;
pub mod manager;
pub mod scheduler;
pub mod store;

use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// How the active credential was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquiredVia {
    /// Operator-supplied token from configuration. Never expires here;
    /// rotation is the operator's responsibility.
    Static,
    /// Interactive proof-key-bound authorization handshake.
    DelegatedAuth,
    /// Session token extracted by the desktop browser collaborator.
    BrowserAssisted,
}

impl AcquiredVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::DelegatedAuth => "delegated-auth",
            Self::BrowserAssisted => "browser-assisted",
        }
    }
}

impl fmt::Display for AcquiredVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bearer credential for the Chatwire API.
///
/// Replaced wholesale on every renewal; no field is ever updated in place,
/// so concurrent readers observe either the old or the new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as epoch seconds. Zero means the token never expires.
    #[serde(default)]
    pub expires_at: u64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub acquired_via: AcquiredVia,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

impl Credential {
    /// The never-expiring credential for a statically configured token.
    pub fn from_static(token: &str) -> Self {
        Self {
            access_token: token.to_owned(),
            refresh_token: None,
            expires_at: 0,
            token_type: default_token_type(),
            acquired_via: AcquiredVia::Static,
        }
    }

    /// Build a credential from a token-endpoint response.
    pub fn from_token_response(token: exchange::TokenResponse, acquired_via: AcquiredVia) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: if token.expires_in == 0 { 0 } else { epoch_secs() + token.expires_in },
            token_type: token.token_type.unwrap_or_else(default_token_type),
            acquired_via,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at != 0 && self.expires_at <= epoch_secs()
    }

    /// Seconds until expiry; `None` for never-expiring credentials.
    pub fn expires_in_secs(&self) -> Option<u64> {
        (self.expires_at != 0).then(|| self.expires_at.saturating_sub(epoch_secs()))
    }
}

/// Error returned by the synchronous token reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// `initialize()` has not completed successfully (or `logout()` ran).
    NotInitialized,
    /// The cached credential was invalidated or expired and not yet repaired.
    NoValidCredential,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("credential manager is not initialized"),
            Self::NoValidCredential => f.write_str("no valid credential; re-authenticate to recover"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Outcome of an operator-facing action. Never a thrown error: the host
/// process renders `message` either way.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// Snapshot returned by the status query.
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<AcquiredVia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<u64>,
}

impl AuthStatus {
    pub fn unauthenticated() -> Self {
        Self { authenticated: false, method: None, expires_at: None, expires_in_secs: None }
    }

    pub fn from_credential(credential: &Credential) -> Self {
        Self {
            authenticated: true,
            method: Some(credential.acquired_via),
            expires_at: (credential.expires_at != 0).then_some(credential.expires_at),
            expires_in_secs: credential.expires_in_secs(),
        }
    }
}

/// Resolve the state directory for persisted credentials.
///
/// Checks `ROOMLINK_STATE_DIR`, then `$XDG_STATE_HOME/roomlink`,
/// then `$HOME/.local/state/roomlink`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ROOMLINK_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("roomlink");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/roomlink");
    }
    PathBuf::from(".roomlink")
}

/// Try to open `url` in the default browser. Failure is not an error: callers
/// always print the raw URL as the manual path.
pub fn open_in_browser(url: &str) -> bool {
    let launcher = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "start"
    } else {
        "xdg-open"
    };
    std::process::Command::new(launcher).arg(url).spawn().is_ok()
}

pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
