// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The credential manager: owns the in-memory cache, picks the acquisition
//! strategy, serves synchronous token reads for any number of concurrent
//! callers, and coordinates persistence and proactive renewal.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::AuthConfig;
use crate::credential::browser::{self, BrowserAssistedAcquirer, SessionTokenSource};
use crate::credential::handshake::{DelegatedAuthSession, HandshakeConfig};
use crate::credential::scheduler::{RenewalScheduler, BROWSER_RENEW_LEAD, DELEGATED_RENEW_LEAD};
use crate::credential::store::CredentialStore;
use crate::credential::{
    exchange, open_in_browser, AcquiredVia, ActionResult, AuthStatus, Credential, TokenError,
};

/// Acquisition strategy, a pure function of configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Static,
    BrowserAssisted,
    DelegatedAuth,
}

impl Strategy {
    /// Fixed priority: static token, then browser-assisted if enabled, then
    /// delegated auth if a client identity is configured. Strategies never
    /// combine: a selected strategy that fails does not fall through to the
    /// next one.
    pub fn select(config: &AuthConfig) -> anyhow::Result<Self> {
        if config.static_token.as_deref().is_some_and(|t| !t.is_empty()) {
            return Ok(Self::Static);
        }
        if config.browser_auth {
            return Ok(Self::BrowserAssisted);
        }
        if config.client_id.as_deref().is_some_and(|c| !c.is_empty()) {
            return Ok(Self::DelegatedAuth);
        }
        anyhow::bail!(
            "no credential strategy configured: set ROOMLINK_STATIC_TOKEN, \
             ROOMLINK_BROWSER_AUTH, or ROOMLINK_CLIENT_ID"
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("static"),
            Self::BrowserAssisted => f.write_str("browser-assisted"),
            Self::DelegatedAuth => f.write_str("delegated-auth"),
        }
    }
}

/// The cache slot. Replaced wholesale so readers observe either the old or
/// the new credential, never a partial one.
enum Cache {
    /// `initialize()` has not succeeded yet, or `logout()` ran.
    Uninitialized,
    /// A renewal failed; reads error until an explicit action repairs it.
    Invalidated,
    Ready(Arc<Credential>),
}

/// Process-wide credential manager. One explicitly-owned instance with a
/// clear init/teardown lifecycle; all access goes through its methods.
pub struct CredentialManager {
    config: AuthConfig,
    store: CredentialStore,
    cache: RwLock<Cache>,
    scheduler: Arc<RenewalScheduler>,
    http: reqwest::Client,
    browser_source: Option<Arc<dyn SessionTokenSource>>,
}

impl CredentialManager {
    /// Build a manager from configuration. The platform default browser
    /// source is attached when the browser-assisted strategy is enabled.
    pub fn new(config: AuthConfig) -> Arc<Self> {
        let browser_source = if config.browser_auth && browser::supported() {
            match browser::default_source(&config) {
                Ok(source) => Some(source),
                Err(e) => {
                    tracing::warn!("browser collaborator unavailable: {e}");
                    None
                }
            }
        } else {
            None
        };
        Self::with_browser_source(config, browser_source)
    }

    /// Build a manager with an explicit collaborator implementation.
    pub fn with_browser_source(
        config: AuthConfig,
        browser_source: Option<Arc<dyn SessionTokenSource>>,
    ) -> Arc<Self> {
        let store = CredentialStore::new(&config.resolve_state_dir());
        Arc::new(Self {
            store,
            cache: RwLock::new(Cache::Uninitialized),
            scheduler: Arc::new(RenewalScheduler::new()),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            browser_source,
            config,
        })
    }

    /// Pick the configured strategy and bring the cache to a usable state.
    ///
    /// Re-initializing with a warm static cache is a no-op; the other
    /// strategies take a fresh look at persisted state and rearm the renewal
    /// timer. No strategy configured is fatal — the process must not run
    /// unauthenticated.
    pub async fn initialize(self: &Arc<Self>) -> anyhow::Result<()> {
        let strategy = Strategy::select(&self.config)?;
        tracing::debug!(%strategy, "initializing credential manager");

        match strategy {
            Strategy::Static => {
                let token = self.config.static_token.clone().unwrap_or_default();
                if let Cache::Ready(ref current) = *self.cache.read() {
                    if current.acquired_via == AcquiredVia::Static
                        && current.access_token == token
                    {
                        return Ok(());
                    }
                }
                // Static tokens originate from configuration: never persisted,
                // never renewed.
                self.publish(Credential::from_static(&token), false);
                Ok(())
            }
            Strategy::BrowserAssisted | Strategy::DelegatedAuth => {
                self.scheduler.disarm();
                let credential = match self.usable_persisted(strategy).await? {
                    Some(credential) => credential,
                    None => self.acquire(strategy).await?,
                };
                self.store.save(&credential)?;
                self.publish(credential, true);
                Ok(())
            }
        }
    }

    /// Synchronous, non-blocking read of the cached token. Never touches the
    /// network or the filesystem.
    pub fn current_token(&self) -> Result<String, TokenError> {
        match &*self.cache.read() {
            Cache::Uninitialized => Err(TokenError::NotInitialized),
            Cache::Invalidated => Err(TokenError::NoValidCredential),
            Cache::Ready(c) if c.is_expired() => Err(TokenError::NoValidCredential),
            Cache::Ready(c) => Ok(c.access_token.clone()),
        }
    }

    /// `Authorization` header value for outbound requests.
    pub fn authorization_header(&self) -> Result<String, TokenError> {
        match &*self.cache.read() {
            Cache::Uninitialized => Err(TokenError::NotInitialized),
            Cache::Invalidated => Err(TokenError::NoValidCredential),
            Cache::Ready(c) if c.is_expired() => Err(TokenError::NoValidCredential),
            Cache::Ready(c) => Ok(format!("{} {}", c.token_type, c.access_token)),
        }
    }

    /// Run whichever strategy applies. Operator-facing: never throws.
    pub async fn authenticate(self: &Arc<Self>) -> ActionResult {
        match self.initialize().await {
            Ok(()) => ActionResult::ok(format!("authenticated via {}", self.method_label())),
            Err(e) => ActionResult::fail(format!("authentication failed: {e:#}")),
        }
    }

    /// Discard persisted and cached state, then acquire from scratch. Used
    /// when a refresh token is suspected revoked or the operator switches
    /// identity.
    pub async fn force_reauthenticate(self: &Arc<Self>) -> ActionResult {
        self.scheduler.disarm();
        if let Err(e) = self.store.clear() {
            return ActionResult::fail(format!("could not clear persisted credential: {e:#}"));
        }
        *self.cache.write() = Cache::Uninitialized;

        match self.initialize().await {
            Ok(()) => ActionResult::ok(format!("re-authenticated via {}", self.method_label())),
            Err(e) => ActionResult::fail(format!("re-authentication failed: {e:#}")),
        }
    }

    /// Clear persisted state, the cache, and the renewal timer, returning the
    /// manager to its pre-initialize state.
    pub fn logout(&self) -> ActionResult {
        self.scheduler.disarm();
        if let Err(e) = self.store.clear() {
            return ActionResult::fail(format!("could not clear persisted credential: {e:#}"));
        }
        *self.cache.write() = Cache::Uninitialized;
        ActionResult::ok("logged out")
    }

    /// Status snapshot of the in-memory cache.
    pub fn status(&self) -> AuthStatus {
        match &*self.cache.read() {
            Cache::Ready(c) if !c.is_expired() => AuthStatus::from_credential(c),
            _ => AuthStatus::unauthenticated(),
        }
    }

    /// Status derived from configuration and persisted state without any
    /// acquisition. Used by short-lived CLI invocations where the cache
    /// starts cold.
    pub fn offline_status(&self) -> AuthStatus {
        if matches!(Strategy::select(&self.config), Ok(Strategy::Static)) {
            return AuthStatus {
                authenticated: true,
                method: Some(AcquiredVia::Static),
                expires_at: None,
                expires_in_secs: None,
            };
        }
        match self.store.load() {
            Ok(Some(c)) if !c.is_expired() => AuthStatus::from_credential(&c),
            _ => AuthStatus::unauthenticated(),
        }
    }

    /// Load the persisted record and decide whether it can seed the cache: it
    /// must match the selected strategy, and an expired delegated record is
    /// refreshed in place when it still carries a refresh token.
    async fn usable_persisted(&self, strategy: Strategy) -> anyhow::Result<Option<Credential>> {
        let Some(persisted) = self.store.load()? else {
            return Ok(None);
        };

        let wanted = match strategy {
            Strategy::BrowserAssisted => AcquiredVia::BrowserAssisted,
            Strategy::DelegatedAuth => AcquiredVia::DelegatedAuth,
            Strategy::Static => return Ok(None),
        };
        if persisted.acquired_via != wanted {
            tracing::debug!(
                persisted = persisted.acquired_via.as_str(),
                selected = wanted.as_str(),
                "ignoring persisted credential from a different strategy"
            );
            return Ok(None);
        }

        if !persisted.is_expired() {
            tracing::info!(via = persisted.acquired_via.as_str(), "adopted persisted credential");
            return Ok(Some(persisted));
        }

        if wanted == AcquiredVia::DelegatedAuth {
            if let Some(refresh_token) = persisted.refresh_token.clone() {
                tracing::info!("persisted credential expired, attempting refresh");
                match self.refreshed(&persisted, &refresh_token).await {
                    Ok(credential) => return Ok(Some(credential)),
                    Err(e) => {
                        tracing::warn!("refresh of persisted credential failed: {e}");
                    }
                }
            }
        }

        Ok(None)
    }

    /// Run the selected strategy's acquisition path.
    async fn acquire(&self, strategy: Strategy) -> anyhow::Result<Credential> {
        match strategy {
            Strategy::Static => {
                Ok(Credential::from_static(self.config.static_token.as_deref().unwrap_or_default()))
            }
            Strategy::BrowserAssisted => {
                let source = self.browser_source.clone().ok_or_else(|| {
                    anyhow::anyhow!(
                        "browser-assisted acquisition is enabled but no collaborator \
                         is available on this platform"
                    )
                })?;
                BrowserAssistedAcquirer::new(source).acquire().await
            }
            Strategy::DelegatedAuth => self.run_handshake().await,
        }
    }

    /// Run one interactive delegated-authorization handshake.
    async fn run_handshake(&self) -> anyhow::Result<Credential> {
        let client_id = self
            .config
            .client_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no client identity configured"))?;

        let session = DelegatedAuthSession::begin(
            self.http.clone(),
            HandshakeConfig {
                authorize_url: self.config.authorize_url.clone(),
                token_url: self.config.token_url.clone(),
                client_id,
                client_secret: self.config.client_secret.clone(),
                scope: self.config.scope.clone(),
                timeout: self.config.handshake_timeout(),
            },
        )
        .await?;

        // The raw URL is always shown: automatic opening can fail silently.
        eprintln!("Open this URL to authorize roomlink:\n  {}", session.authorize_url());
        if !open_in_browser(session.authorize_url()) {
            tracing::debug!("could not open the default browser");
        }

        session.finish().await
    }

    /// One refresh exchange; carries the previous refresh token forward when
    /// the endpoint does not rotate it.
    async fn refreshed(
        &self,
        previous: &Credential,
        refresh_token: &str,
    ) -> anyhow::Result<Credential> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no client identity configured for refresh"))?;

        let token = exchange::refresh(
            &self.http,
            &self.config.token_url,
            client_id,
            self.config.client_secret.as_deref(),
            refresh_token,
        )
        .await?;

        let mut next = Credential::from_token_response(token, AcquiredVia::DelegatedAuth);
        if next.refresh_token.is_none() {
            next.refresh_token = previous.refresh_token.clone();
        }
        Ok(next)
    }

    /// Background renewal fired by the scheduler. While it runs, readers keep
    /// getting the old (still valid) credential; on success the cache is
    /// replaced atomically and the timer rearms. On failure the cache is
    /// invalidated and nothing retries — recovery is the next explicit
    /// authenticate or re-authenticate.
    async fn renew(self: &Arc<Self>) {
        let current = match &*self.cache.read() {
            Cache::Ready(c) => Arc::clone(c),
            _ => return,
        };

        tracing::info!(via = current.acquired_via.as_str(), "renewing credential");
        let outcome = match current.acquired_via {
            AcquiredVia::Static => return,
            AcquiredVia::DelegatedAuth => match current.refresh_token.as_deref() {
                Some(rt) => self.refreshed(&current, rt).await,
                None => Err(anyhow::anyhow!("no refresh token available")),
            },
            AcquiredVia::BrowserAssisted => self.acquire(Strategy::BrowserAssisted).await,
        };

        match outcome {
            Ok(next) => {
                // A persist failure must not take down a working credential;
                // it degrades restart behavior only, so log loudly and go on.
                if let Err(e) = self.store.save(&next) {
                    tracing::error!("failed to persist renewed credential: {e:#}");
                }
                self.publish(next, true);
                tracing::info!("credential renewed");
            }
            Err(e) => {
                tracing::warn!("credential renewal failed: {e:#}");
                self.invalidate();
            }
        }
    }

    /// Replace the cache value and optionally (re)arm the renewal timer.
    fn publish(self: &Arc<Self>, credential: Credential, arm: bool) {
        let credential = Arc::new(credential);
        *self.cache.write() = Cache::Ready(Arc::clone(&credential));
        if arm {
            self.arm_renewal(&credential);
        }
    }

    fn arm_renewal(self: &Arc<Self>, credential: &Credential) {
        let lead = match credential.acquired_via {
            AcquiredVia::Static => return,
            AcquiredVia::DelegatedAuth => DELEGATED_RENEW_LEAD,
            AcquiredVia::BrowserAssisted => BROWSER_RENEW_LEAD,
        };
        let Some(delay) = RenewalScheduler::renew_delay(credential.expires_at, lead) else {
            tracing::warn!(
                expires_at = credential.expires_at,
                "credential already inside the renewal window; not arming"
            );
            return;
        };

        tracing::debug!(
            delay_secs = delay.as_secs(),
            via = credential.acquired_via.as_str(),
            "renewal armed"
        );
        let manager = Arc::clone(self);
        self.scheduler.arm(delay, move || async move {
            manager.renew().await;
        });
    }

    fn invalidate(&self) {
        self.scheduler.disarm();
        *self.cache.write() = Cache::Invalidated;
    }

    fn method_label(&self) -> &'static str {
        match &*self.cache.read() {
            Cache::Ready(c) => c.acquired_via.as_str(),
            _ => "unknown",
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
