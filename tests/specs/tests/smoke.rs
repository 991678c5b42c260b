// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `roomlink` binary and exercise
//! the operator actions against an isolated state directory.

use roomlink::credential::store::CredentialStore;
use roomlink::credential::{AcquiredVia, Credential};
use roomlink_specs::run_roomlink;

#[test]
fn status_on_a_clean_state_dir_is_unauthenticated() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let run = run_roomlink(dir.path(), &[], &["status"])?;

    assert!(run.success(), "stderr: {}", run.stderr);
    let status: serde_json::Value = serde_json::from_str(&run.stdout)?;
    assert_eq!(status["authenticated"], false);
    Ok(())
}

#[test]
fn static_token_login_then_status_round_trips() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let envs: &[(&str, &str)] = &[("ROOMLINK_STATIC_TOKEN", "abc123")];

    let login = run_roomlink(dir.path(), envs, &["login"])?;
    assert!(login.success(), "stderr: {}", login.stderr);
    assert!(login.stdout.contains("static"), "stdout: {}", login.stdout);

    let status = run_roomlink(dir.path(), envs, &["status"])?;
    assert!(status.success(), "stderr: {}", status.stderr);
    let parsed: serde_json::Value = serde_json::from_str(&status.stdout)?;
    assert_eq!(parsed["authenticated"], true);
    assert_eq!(parsed["method"], "static");
    Ok(())
}

#[test]
fn login_without_any_strategy_fails_with_a_clear_message() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let run = run_roomlink(dir.path(), &[], &["login"])?;

    assert!(!run.success(), "login must fail with nothing configured");
    assert!(run.stderr.contains("no credential strategy"), "stderr: {}", run.stderr);
    Ok(())
}

#[test]
fn status_reads_a_persisted_record_and_logout_clears_it() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    // Seed a record as a prior delegated-auth session would have left it.
    let store = CredentialStore::new(dir.path());
    store.save(&Credential {
        access_token: "tok-from-last-run".to_owned(),
        refresh_token: Some("ref1".to_owned()),
        expires_at: 9_999_999_999,
        token_type: "Bearer".to_owned(),
        acquired_via: AcquiredVia::DelegatedAuth,
    })?;

    let status = run_roomlink(dir.path(), &[], &["status"])?;
    assert!(status.success(), "stderr: {}", status.stderr);
    let parsed: serde_json::Value = serde_json::from_str(&status.stdout)?;
    assert_eq!(parsed["authenticated"], true);
    assert_eq!(parsed["method"], "delegated-auth");

    let logout = run_roomlink(dir.path(), &[], &["logout"])?;
    assert!(logout.success(), "stderr: {}", logout.stderr);
    assert!(!store.path().exists(), "logout must remove the persisted record");

    let after = run_roomlink(dir.path(), &[], &["status"])?;
    let parsed: serde_json::Value = serde_json::from_str(&after.stdout)?;
    assert_eq!(parsed["authenticated"], false);
    Ok(())
}

#[test]
fn corrupt_persisted_record_does_not_crash_status() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("credential.json"), b"{definitely not json")?;

    let run = run_roomlink(dir.path(), &[], &["status"])?;
    assert!(run.success(), "stderr: {}", run.stderr);
    let parsed: serde_json::Value = serde_json::from_str(&run.stdout)?;
    assert_eq!(parsed["authenticated"], false);
    Ok(())
}
