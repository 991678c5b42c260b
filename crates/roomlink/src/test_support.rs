// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: config builders, the mock token endpoint, and
//! assertion helpers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once};

use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::config::AuthConfig;

/// Install the process-wide rustls crypto provider the `rustls-no-provider`
/// build requires before any `reqwest::Client` is built.
///
/// In production `main` does this once at startup; test binaries have no such
/// entry point, so every helper that leads to a client build calls this first.
/// Idempotent: only the first install takes effect.
pub fn ensure_crypto_provider() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// An [`AuthConfig`] with defaults matching the CLI's, rooted at `state_dir`.
/// Tests override the fields they care about.
pub fn auth_config(state_dir: &std::path::Path) -> AuthConfig {
    ensure_crypto_provider();
    AuthConfig {
        static_token: None,
        client_id: None,
        client_secret: None,
        scope: "chat:all".to_owned(),
        browser_auth: false,
        browser_manual: false,
        browser_command: None,
        portal_url: "https://app.chatwire.io/session".to_owned(),
        authorize_url: "https://auth.chatwire.io/v1/authorize".to_owned(),
        token_url: "https://auth.chatwire.io/v1/access_token".to_owned(),
        handshake_timeout_secs: 300,
        state_dir: Some(state_dir.to_path_buf()),
    }
}

/// A running mock token endpoint.
pub struct MockTokenServer {
    /// Full URL of the token route.
    pub url: String,
    /// Number of requests received.
    pub calls: Arc<AtomicU32>,
    /// Raw request bodies, in arrival order.
    pub bodies: Arc<Mutex<Vec<String>>>,
}

/// Start a mock token endpoint returning the configured `(status, body)`
/// responses in order, repeating the last one.
pub async fn mock_token_server(responses: Vec<(u16, String)>) -> MockTokenServer {
    ensure_crypto_provider();
    let calls = Arc::new(AtomicU32::new(0));
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let responses = Arc::new(responses);

    let handler_calls = Arc::clone(&calls);
    let handler_bodies = Arc::clone(&bodies);
    let app = Router::new().route(
        "/token",
        post(move |body: String| {
            let calls = Arc::clone(&handler_calls);
            let bodies = Arc::clone(&handler_bodies);
            let responses = Arc::clone(&responses);
            async move {
                let idx = calls.fetch_add(1, Ordering::Relaxed) as usize;
                bodies.lock().push(body);
                let (status, body) = responses
                    .get(idx)
                    .or_else(|| responses.last())
                    .cloned()
                    .unwrap_or((500, "{}".to_owned()));
                (
                    axum::http::StatusCode::from_u16(status)
                        .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
                    body,
                )
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
        unreachable!("binding 127.0.0.1:0 cannot fail: {e}");
    });
    let addr = match listener.local_addr() {
        Ok(a) => a,
        Err(e) => unreachable!("local_addr on a bound listener cannot fail: {e}"),
    };
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    MockTokenServer { url: format!("http://{addr}/token"), calls, bodies }
}

/// A successful token-endpoint JSON body.
pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> String {
    let mut body = serde_json::json!({
        "access_token": access,
        "expires_in": expires_in,
    });
    if let Some(r) = refresh {
        body["refresh_token"] = serde_json::Value::String(r.to_owned());
    }
    body.to_string()
}
