// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The delegated authorization handshake.
//!
//! One session runs one interactive flow: bind a short-lived callback
//! listener on a loopback port, hand the proof-key-bound authorization URL to
//! the operator, wait for the provider's redirect, validate it, and exchange
//! the code for a credential. The listener is torn down exactly once on every
//! exit path — success, validation failure, exchange failure, or timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::credential::{challenge, exchange, AcquiredVia, Credential};

/// Only one interactive handshake may run per process; a second listener
/// would race the first for the operator's browser redirect.
static HANDSHAKE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Default deadline for the whole handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Phases of one handshake, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Listening,
    AwaitingCallback,
    Exchanging,
    Complete,
    Failed,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::AwaitingCallback => "awaiting-callback",
            Self::Exchanging => "exchanging",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// Endpoint and client identity inputs for one handshake.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub authorize_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scope: String,
    pub timeout: Duration,
}

/// Redirect parameters delivered by the authorization server.
#[derive(Debug, Clone, Default, Deserialize)]
struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Shared state for the callback route: the expected nonce plus the one-shot
/// slot that delivers the first redirect to the waiting session.
struct CallbackGate {
    expected_state: String,
    slot: Mutex<Option<oneshot::Sender<CallbackParams>>>,
}

/// Releases the process-wide handshake slot when the session ends.
struct ActiveGuard;

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        HANDSHAKE_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// One interactive authorization handshake. Created by [`begin`], consumed by
/// [`finish`]; never outlives the flow it runs.
///
/// [`begin`]: DelegatedAuthSession::begin
/// [`finish`]: DelegatedAuthSession::finish
pub struct DelegatedAuthSession {
    config: HandshakeConfig,
    http: reqwest::Client,
    verifier: String,
    state: String,
    authorize_url: String,
    redirect_uri: String,
    deadline: tokio::time::Instant,
    phase: Phase,
    callback_rx: Option<oneshot::Receiver<CallbackParams>>,
    shutdown: CancellationToken,
    server: Option<JoinHandle<()>>,
    _active: ActiveGuard,
}

impl DelegatedAuthSession {
    /// Bind the local callback listener and construct the authorization URL.
    ///
    /// Fails fast if another handshake is already pending in this process.
    pub async fn begin(http: reqwest::Client, config: HandshakeConfig) -> anyhow::Result<Self> {
        if HANDSHAKE_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            anyhow::bail!("an authorization handshake is already in progress");
        }
        let active = ActiveGuard;

        let verifier = challenge::new_verifier();
        let code_challenge = challenge::challenge_for(&verifier);
        let state = challenge::new_state();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}/callback");
        tracing::debug!(port, phase = Phase::Listening.as_str(), "callback listener bound");

        let (tx, rx) = oneshot::channel();
        let gate = Arc::new(CallbackGate {
            expected_state: state.clone(),
            slot: Mutex::new(Some(tx)),
        });
        let router = Router::new().route("/callback", get(handle_callback)).with_state(gate);

        let shutdown = CancellationToken::new();
        let server = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                if let Err(e) = axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await
                {
                    tracing::debug!("callback listener error: {e}");
                }
            }
        });

        let authorize_url = challenge::build_authorize_url(
            &config.authorize_url,
            &config.client_id,
            &redirect_uri,
            &config.scope,
            &code_challenge,
            &state,
        );
        let deadline = tokio::time::Instant::now() + config.timeout;
        tracing::debug!(phase = Phase::AwaitingCallback.as_str(), "authorization URL ready");

        Ok(Self {
            config,
            http,
            verifier,
            state,
            authorize_url,
            redirect_uri,
            deadline,
            phase: Phase::AwaitingCallback,
            callback_rx: Some(rx),
            shutdown,
            server: Some(server),
            _active: active,
        })
    }

    /// The URL the operator must open. Callers print it as well as trying the
    /// default browser, since automatic opening can fail silently.
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    /// The loopback redirect URI registered for this handshake.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Wait for the redirect callback, validate it, and exchange the code.
    pub async fn finish(mut self) -> anyhow::Result<Credential> {
        let result = self.await_and_exchange().await;
        self.phase = if result.is_ok() { Phase::Complete } else { Phase::Failed };
        tracing::debug!(phase = self.phase.as_str(), "handshake finished");
        self.teardown().await;
        result
    }

    async fn await_and_exchange(&mut self) -> anyhow::Result<Credential> {
        let Some(rx) = self.callback_rx.take() else {
            anyhow::bail!("handshake already finished");
        };

        let params = match tokio::time::timeout_at(self.deadline, rx).await {
            Ok(Ok(params)) => params,
            Ok(Err(_)) => anyhow::bail!("callback listener closed before a redirect arrived"),
            Err(_) => anyhow::bail!(
                "timed out after {}s waiting for the authorization redirect",
                self.config.timeout.as_secs()
            ),
        };

        if let Some(error) = params.error {
            let detail = params.error_description.unwrap_or_default();
            anyhow::bail!("authorization server reported an error: {error}: {detail}");
        }

        // The whole nonce must match; anything else is a forged or replayed
        // redirect and the code, even if present, is never exchanged.
        if params.state.as_deref() != Some(self.state.as_str()) {
            anyhow::bail!("state nonce mismatch in authorization callback; rejecting the response");
        }

        let code = params
            .code
            .ok_or_else(|| anyhow::anyhow!("authorization callback carried no code"))?;

        self.phase = Phase::Exchanging;
        tracing::debug!(phase = self.phase.as_str(), "exchanging authorization code");
        let token = exchange::exchange_code(
            &self.http,
            &self.config.token_url,
            &self.config.client_id,
            self.config.client_secret.as_deref(),
            &code,
            &self.verifier,
            &self.redirect_uri,
        )
        .await?;

        Ok(Credential::from_token_response(token, AcquiredVia::DelegatedAuth))
    }

    /// Tear the listener down and wait for the socket to close. Runs exactly
    /// once; `Drop` covers sessions abandoned without `finish`.
    async fn teardown(&mut self) {
        self.shutdown.cancel();
        if let Some(server) = self.server.take() {
            let _ = server.await;
        }
    }
}

impl Drop for DelegatedAuthSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// The one callback route. Serves an acknowledgement page so the interactive
/// flow has a visible completion signal, then hands the parameters to the
/// waiting session. Late or duplicate redirects get a neutral page.
async fn handle_callback(
    State(gate): State<Arc<CallbackGate>>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let Some(tx) = gate.slot.lock().take() else {
        return Html(PAGE_NOT_PENDING);
    };

    let accepted =
        params.error.is_none() && params.state.as_deref() == Some(gate.expected_state.as_str());
    let _ = tx.send(params);

    if accepted {
        Html(PAGE_COMPLETE)
    } else {
        Html(PAGE_REJECTED)
    }
}

const PAGE_COMPLETE: &str = "<!doctype html><html><body>\
<h2>Authorization complete</h2>\
<p>Roomlink received the authorization response. You can close this window.</p>\
</body></html>";

const PAGE_REJECTED: &str = "<!doctype html><html><body>\
<h2>Authorization not completed</h2>\
<p>The authorization response was rejected. Check the terminal for details.</p>\
</body></html>";

const PAGE_NOT_PENDING: &str = "<!doctype html><html><body>\
<h2>No authorization pending</h2>\
<p>This handshake has already finished. You can close this window.</p>\
</body></html>";

#[cfg(test)]
#[path = "handshake_tests.rs"]
mod tests;
