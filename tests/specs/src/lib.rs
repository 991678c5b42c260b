// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Runs the real `roomlink` binary with an isolated state directory and a
//! scrubbed environment, and captures its output.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Credential-related env vars scrubbed before every run so the ambient
/// environment cannot leak a strategy into a test.
const SCRUBBED_ENV: &[&str] = &[
    "ROOMLINK_STATIC_TOKEN",
    "ROOMLINK_CLIENT_ID",
    "ROOMLINK_CLIENT_SECRET",
    "ROOMLINK_SCOPE",
    "ROOMLINK_BROWSER_AUTH",
    "ROOMLINK_BROWSER_MANUAL",
    "ROOMLINK_BROWSER_COMMAND",
    "ROOMLINK_PORTAL_URL",
    "ROOMLINK_AUTHORIZE_URL",
    "ROOMLINK_TOKEN_URL",
    "ROOMLINK_HANDSHAKE_TIMEOUT_SECS",
    "ROOMLINK_STATE_DIR",
];

/// Resolve the path to the compiled `roomlink` binary.
pub fn roomlink_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("roomlink")
}

/// Captured output of one binary invocation.
pub struct CliRun {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliRun {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `roomlink` with the given args, extra env, and an isolated state dir.
pub fn run_roomlink(
    state_dir: &Path,
    envs: &[(&str, &str)],
    args: &[&str],
) -> anyhow::Result<CliRun> {
    let binary = roomlink_binary();
    anyhow::ensure!(
        binary.exists(),
        "roomlink binary not found at {} (run `cargo build` first)",
        binary.display()
    );

    let mut cmd = Command::new(&binary);
    for key in SCRUBBED_ENV {
        cmd.env_remove(key);
    }
    cmd.args(args)
        .env("ROOMLINK_STATE_DIR", state_dir)
        .env("ROOMLINK_LOG", "warn");
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let output = cmd.output()?;
    Ok(CliRun {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
