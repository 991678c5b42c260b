// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential and endpoint configuration, from flags or environment.

use std::path::PathBuf;
use std::time::Duration;

/// Everything the credential manager needs to pick and run a strategy.
///
/// Strategy priority is fixed: a static token wins, then the browser-assisted
/// mode if enabled, then delegated auth if a client identity is set.
#[derive(Debug, Clone, clap::Args)]
pub struct AuthConfig {
    /// Static bearer token. Takes priority over every other strategy.
    #[arg(long, env = "ROOMLINK_STATIC_TOKEN")]
    pub static_token: Option<String>,

    /// OAuth client ID for the delegated authorization flow.
    #[arg(long, env = "ROOMLINK_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret for the delegated authorization flow.
    #[arg(long, env = "ROOMLINK_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// Requested authorization scope.
    #[arg(long, env = "ROOMLINK_SCOPE", default_value = "chat:all")]
    pub scope: String,

    /// Acquire the credential by extracting a browser session token (macOS).
    #[arg(long, env = "ROOMLINK_BROWSER_AUTH")]
    pub browser_auth: bool,

    /// Browser sub-mode: open the portal, then read the token from the
    /// clipboard on confirmation.
    #[arg(long, env = "ROOMLINK_BROWSER_MANUAL")]
    pub browser_manual: bool,

    /// Collaborator command for automated browser extraction. Must print
    /// `{"token": ..., "expiresAt": ...}` on stdout.
    #[arg(long, env = "ROOMLINK_BROWSER_COMMAND")]
    pub browser_command: Option<String>,

    /// Portal page opened for the manual browser sub-mode.
    #[arg(long, env = "ROOMLINK_PORTAL_URL", default_value = "https://app.chatwire.io/session")]
    pub portal_url: String,

    /// Authorization endpoint.
    #[arg(
        long,
        env = "ROOMLINK_AUTHORIZE_URL",
        default_value = "https://auth.chatwire.io/v1/authorize"
    )]
    pub authorize_url: String,

    /// Token endpoint.
    #[arg(
        long,
        env = "ROOMLINK_TOKEN_URL",
        default_value = "https://auth.chatwire.io/v1/access_token"
    )]
    pub token_url: String,

    /// Seconds to wait for the interactive authorization callback.
    #[arg(
        long,
        env = "ROOMLINK_HANDSHAKE_TIMEOUT_SECS",
        default_value_t = crate::credential::handshake::DEFAULT_TIMEOUT.as_secs()
    )]
    pub handshake_timeout_secs: u64,

    /// Directory for persisted credential state.
    #[arg(long, env = "ROOMLINK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

impl AuthConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// The state directory: the explicit flag, or the env fallback chain.
    pub fn resolve_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(crate::credential::state_dir)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
