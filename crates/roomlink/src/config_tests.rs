// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;
use serial_test::serial;

use super::AuthConfig;

#[derive(Debug, Parser)]
struct TestCli {
    #[command(flatten)]
    auth: AuthConfig,
}

fn parse(args: &[&str]) -> AuthConfig {
    TestCli::parse_from(args).auth
}

// #[serial]: clap reads ROOMLINK_* env fallbacks, and other tests mutate env.

#[test]
#[serial]
fn defaults_cover_endpoints_scope_and_timeout() {
    let config = parse(&["roomlink"]);

    assert_eq!(config.scope, "chat:all");
    assert_eq!(config.authorize_url, "https://auth.chatwire.io/v1/authorize");
    assert_eq!(config.token_url, "https://auth.chatwire.io/v1/access_token");
    assert_eq!(config.portal_url, "https://app.chatwire.io/session");
    assert_eq!(config.handshake_timeout(), Duration::from_secs(300));
    assert!(config.static_token.is_none());
    assert!(!config.browser_auth);
}

#[test]
#[serial]
fn flags_override_defaults() {
    let config = parse(&[
        "roomlink",
        "--static-token",
        "abc123",
        "--scope",
        "chat:rooms",
        "--token-url",
        "http://127.0.0.1:9/token",
        "--handshake-timeout-secs",
        "30",
    ]);

    assert_eq!(config.static_token.as_deref(), Some("abc123"));
    assert_eq!(config.scope, "chat:rooms");
    assert_eq!(config.token_url, "http://127.0.0.1:9/token");
    assert_eq!(config.handshake_timeout(), Duration::from_secs(30));
}

#[test]
#[serial]
fn browser_flags_parse() {
    let config = parse(&[
        "roomlink",
        "--browser-auth",
        "--browser-manual",
        "--browser-command",
        "chatwire-extract",
    ]);

    assert!(config.browser_auth);
    assert!(config.browser_manual);
    assert_eq!(config.browser_command.as_deref(), Some("chatwire-extract"));
}

#[test]
#[serial]
fn explicit_state_dir_wins_over_env_resolution() {
    let config = parse(&["roomlink", "--state-dir", "/tmp/roomlink-here"]);
    assert_eq!(config.resolve_state_dir(), std::path::PathBuf::from("/tmp/roomlink-here"));
}
