// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-endpoint exchanges shared by the handshake and renewal paths.
//!
//! Both grants are single attempts. A failed refresh invalidates the cache
//! and waits for an explicit re-authenticate; nothing here retries.

use serde::Deserialize;

/// Successful token-endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds. Zero when the endpoint does not report one.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange an authorization code plus its proof-key verifier for tokens.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: Option<&str>,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
) -> anyhow::Result<TokenResponse> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("client_id", client_id),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("code_verifier", verifier),
    ];
    if let Some(secret) = client_secret {
        form.push(("client_secret", secret));
    }
    post_form(client, token_url, &form, "code exchange").await
}

/// Exchange a refresh token for fresh tokens.
pub async fn refresh(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
) -> anyhow::Result<TokenResponse> {
    let mut form = vec![
        ("grant_type", "refresh_token"),
        ("client_id", client_id),
        ("refresh_token", refresh_token),
    ];
    if let Some(secret) = client_secret {
        form.push(("client_secret", secret));
    }
    post_form(client, token_url, &form, "refresh").await
}

/// POST a form to the token endpoint. Non-success responses surface the
/// provider's error body verbatim.
async fn post_form(
    client: &reqwest::Client,
    token_url: &str,
    form: &[(&str, &str)],
    what: &str,
) -> anyhow::Result<TokenResponse> {
    let resp = client.post(token_url).form(form).send().await?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
            anyhow::bail!(
                "{what} failed ({status}): {}: {}",
                err.error,
                err.error_description.unwrap_or_default()
            );
        }
        anyhow::bail!("{what} failed ({status}): {body}");
    }

    let token: TokenResponse = serde_json::from_str(&body)?;
    Ok(token)
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
