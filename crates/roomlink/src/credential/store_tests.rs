// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::credential::AcquiredVia;

fn delegated_credential() -> Credential {
    Credential {
        access_token: "tok1".to_owned(),
        refresh_token: Some("ref1".to_owned()),
        expires_at: 9_999_999_999,
        token_type: "Bearer".to_owned(),
        acquired_via: AcquiredVia::DelegatedAuth,
    }
}

#[test]
fn save_then_load_round_trips_all_fields() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path());

    let credential = delegated_credential();
    store.save(&credential)?;

    let loaded = store.load()?.expect("record should exist");
    assert_eq!(loaded, credential);
    Ok(())
}

#[test]
fn load_missing_returns_none() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path());
    assert!(store.load()?.is_none());
    Ok(())
}

#[test]
fn corrupt_file_reads_as_absent_and_save_recovers() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path());

    std::fs::write(store.path(), b"{not json!")?;
    assert!(store.load()?.is_none(), "malformed record must read as absent, not error");

    let credential = delegated_credential();
    store.save(&credential)?;
    assert_eq!(store.load()?.expect("record"), credential);
    Ok(())
}

#[test]
fn save_replaces_prior_record() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path());

    store.save(&delegated_credential())?;
    let mut second = delegated_credential();
    second.access_token = "tok2".to_owned();
    store.save(&second)?;

    assert_eq!(store.load()?.expect("record").access_token, "tok2");
    Ok(())
}

#[test]
fn clear_removes_record_and_is_idempotent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path());

    store.clear()?;

    store.save(&delegated_credential())?;
    assert!(store.path().exists());
    store.clear()?;
    assert!(!store.path().exists());
    store.clear()?;
    Ok(())
}

#[test]
fn save_creates_missing_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = dir.path().join("state/roomlink");
    let store = CredentialStore::new(&nested);

    store.save(&delegated_credential())?;
    assert!(store.load()?.is_some());
    Ok(())
}

#[cfg(unix)]
#[test]
fn record_and_directory_are_owner_only() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let nested = dir.path().join("private");
    let store = CredentialStore::new(&nested);
    store.save(&delegated_credential())?;

    let file_mode = std::fs::metadata(store.path())?.permissions().mode() & 0o777;
    assert_eq!(file_mode, 0o600, "record file must be owner read/write only");

    let dir_mode = std::fs::metadata(&nested)?.permissions().mode() & 0o777;
    assert_eq!(dir_mode, 0o700, "state directory must be owner-only");
    Ok(())
}
