// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::Ordering;

use super::*;
use crate::test_support::{mock_token_server, token_body};

#[tokio::test]
async fn exchange_code_posts_grant_and_parses_response() -> anyhow::Result<()> {
    let server = mock_token_server(vec![(200, token_body("tok1", Some("ref1"), 3600))]).await;
    let client = reqwest::Client::new();

    let token = exchange_code(
        &client,
        &server.url,
        "client-123",
        None,
        "XYZ",
        "verifier-abc",
        "http://127.0.0.1:9/callback",
    )
    .await?;

    assert_eq!(token.access_token, "tok1");
    assert_eq!(token.refresh_token.as_deref(), Some("ref1"));
    assert_eq!(token.expires_in, 3600);
    assert_eq!(server.calls.load(Ordering::Relaxed), 1);

    let bodies = server.bodies.lock();
    let body = &bodies[0];
    assert!(body.contains("grant_type=authorization_code"), "body: {body}");
    assert!(body.contains("code=XYZ"));
    assert!(body.contains("code_verifier=verifier-abc"));
    assert!(!body.contains("client_secret"), "no secret configured: {body}");
    Ok(())
}

#[tokio::test]
async fn exchange_code_includes_client_secret_when_configured() -> anyhow::Result<()> {
    let server = mock_token_server(vec![(200, token_body("tok1", None, 60))]).await;
    let client = reqwest::Client::new();

    exchange_code(
        &client,
        &server.url,
        "client-123",
        Some("s3cret"),
        "XYZ",
        "verifier-abc",
        "http://127.0.0.1:9/callback",
    )
    .await?;

    let bodies = server.bodies.lock();
    assert!(bodies[0].contains("client_secret=s3cret"));
    Ok(())
}

#[tokio::test]
async fn exchange_code_surfaces_provider_error_body() {
    let error_body = serde_json::json!({
        "error": "invalid_grant",
        "error_description": "authorization code expired"
    })
    .to_string();
    let server = mock_token_server(vec![(400, error_body)]).await;
    let client = reqwest::Client::new();

    let result = exchange_code(
        &client,
        &server.url,
        "client-123",
        None,
        "stale",
        "verifier",
        "http://127.0.0.1:9/callback",
    )
    .await;

    let err = result.expect_err("exchange must fail").to_string();
    assert!(err.contains("invalid_grant"), "{err}");
    assert!(err.contains("authorization code expired"), "{err}");
}

#[tokio::test]
async fn refresh_posts_refresh_grant() -> anyhow::Result<()> {
    let server = mock_token_server(vec![(200, token_body("tok2", Some("ref2"), 7200))]).await;
    let client = reqwest::Client::new();

    let token = refresh(&client, &server.url, "client-123", None, "ref1").await?;

    assert_eq!(token.access_token, "tok2");
    assert_eq!(token.refresh_token.as_deref(), Some("ref2"));

    let bodies = server.bodies.lock();
    assert!(bodies[0].contains("grant_type=refresh_token"));
    assert!(bodies[0].contains("refresh_token=ref1"));
    Ok(())
}

#[tokio::test]
async fn refresh_surfaces_non_json_error_raw() {
    let server = mock_token_server(vec![(502, "bad gateway".to_owned())]).await;
    let client = reqwest::Client::new();

    let result = refresh(&client, &server.url, "client-123", None, "ref1").await;
    crate::assert_err_contains!(result, "bad gateway");
}

#[tokio::test]
async fn refresh_is_a_single_attempt() {
    let server = mock_token_server(vec![(500, "{}".to_owned())]).await;
    let client = reqwest::Client::new();

    let result = refresh(&client, &server.url, "client-123", None, "ref1").await;
    assert!(result.is_err());
    assert_eq!(server.calls.load(Ordering::Relaxed), 1, "no retries on failure");
}
