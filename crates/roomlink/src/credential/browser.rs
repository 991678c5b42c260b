// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser-assisted acquisition: a thin adapter over the desktop
//! browser-automation collaborator.
//!
//! The collaborator is external; this module only wraps its "extract a
//! session token" capability into the common credential shape. Two sub-modes
//! exist — fully automated extraction and a manual portal-plus-clipboard
//! variant — and the manager cannot tell them apart.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AuthConfig;
use crate::credential::{epoch_secs, open_in_browser, AcquiredVia, Credential};

/// Session token handed back by the collaborator, with its estimated expiry.
#[derive(Debug, Clone)]
pub struct ExtractedSession {
    pub token: String,
    /// Estimated expiry as epoch seconds.
    pub expires_at: u64,
}

/// Capability of the desktop browser-automation collaborator: produce a
/// session token and its estimated expiry. Implementations may block.
pub trait SessionTokenSource: Send + Sync {
    /// Short label for logs.
    fn label(&self) -> &'static str;

    fn extract(&self) -> anyhow::Result<ExtractedSession>;
}

/// Wraps any [`SessionTokenSource`] result into the common credential shape.
pub struct BrowserAssistedAcquirer {
    source: Arc<dyn SessionTokenSource>,
}

impl BrowserAssistedAcquirer {
    pub fn new(source: Arc<dyn SessionTokenSource>) -> Self {
        Self { source }
    }

    /// Run extraction on the blocking pool and tag the result.
    pub async fn acquire(&self) -> anyhow::Result<Credential> {
        let source = Arc::clone(&self.source);
        tracing::info!(source = source.label(), "extracting session token from browser");
        let session = tokio::task::spawn_blocking(move || source.extract()).await??;

        if session.token.is_empty() {
            anyhow::bail!("browser extraction returned an empty token");
        }

        Ok(Credential {
            access_token: session.token,
            refresh_token: None,
            expires_at: session.expires_at,
            token_type: "Bearer".to_owned(),
            acquired_via: AcquiredVia::BrowserAssisted,
        })
    }
}

/// Whether the collaborator is supported on this platform.
pub fn supported() -> bool {
    cfg!(target_os = "macos")
}

/// Lifetime estimate for a session token whose expiry the collaborator cannot
/// observe (the manual clipboard path).
const ESTIMATED_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Build the platform default source for the configured sub-mode.
pub fn default_source(config: &AuthConfig) -> anyhow::Result<Arc<dyn SessionTokenSource>> {
    if !supported() {
        anyhow::bail!("browser-assisted acquisition is only supported on macOS");
    }
    if config.browser_manual {
        return Ok(Arc::new(ManualPortalSource { portal_url: config.portal_url.clone() }));
    }
    let command = config.browser_command.clone().ok_or_else(|| {
        anyhow::anyhow!("--browser-command is required for automated browser extraction")
    })?;
    Ok(Arc::new(CollaboratorCommandSource { command }))
}

/// Automated sub-mode: run the collaborator command and parse the
/// `{"token": ..., "expiresAt": ...}` JSON it prints.
pub struct CollaboratorCommandSource {
    pub command: String,
}

impl SessionTokenSource for CollaboratorCommandSource {
    fn label(&self) -> &'static str {
        "automated"
    }

    fn extract(&self) -> anyhow::Result<ExtractedSession> {
        let output = std::process::Command::new("sh").arg("-c").arg(&self.command).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("browser collaborator exited with {}: {stderr}", output.status);
        }
        parse_collaborator_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Manual sub-mode: open the portal page, wait for the operator's explicit
/// confirmation, then read the copied token from the system clipboard.
pub struct ManualPortalSource {
    pub portal_url: String,
}

impl SessionTokenSource for ManualPortalSource {
    fn label(&self) -> &'static str {
        "manual"
    }

    fn extract(&self) -> anyhow::Result<ExtractedSession> {
        eprintln!("Opening {} — copy the session token there.", self.portal_url);
        if !open_in_browser(&self.portal_url) {
            eprintln!("(Could not open the browser automatically; open the URL yourself.)");
        }
        eprintln!("Press Enter once the token is on the clipboard.");

        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;

        let token = read_clipboard()?.trim().to_owned();
        if token.is_empty() {
            anyhow::bail!("clipboard did not contain a session token");
        }
        Ok(ExtractedSession {
            token,
            expires_at: epoch_secs() + ESTIMATED_SESSION_TTL.as_secs(),
        })
    }
}

/// Parse the collaborator's stdout. A missing expiry gets the fixed estimate.
fn parse_collaborator_output(stdout: &str) -> anyhow::Result<ExtractedSession> {
    let value: serde_json::Value = serde_json::from_str(stdout.trim())
        .map_err(|e| anyhow::anyhow!("collaborator output is not JSON: {e}"))?;

    let token = value
        .get("token")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("collaborator output missing token"))?
        .to_owned();

    let expires_at = value
        .get("expiresAt")
        .and_then(|v| v.as_u64())
        .unwrap_or_else(|| epoch_secs() + ESTIMATED_SESSION_TTL.as_secs());

    Ok(ExtractedSession { token, expires_at })
}

fn read_clipboard() -> anyhow::Result<String> {
    // pbpaste, since the collaborator's supported platform is macOS.
    let output = std::process::Command::new("pbpaste").output()?;
    anyhow::ensure!(output.status.success(), "pbpaste exited with {}", output.status);
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
