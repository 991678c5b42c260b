// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential lifecycle subcommands: login, reauth, logout, status.

use crate::config::AuthConfig;
use crate::credential::manager::CredentialManager;
use crate::credential::ActionResult;

#[derive(Debug, clap::Subcommand)]
pub enum AuthCommand {
    /// Authenticate with whichever strategy the configuration selects.
    Login,
    /// Discard all credential state and authenticate from scratch.
    Reauth,
    /// Clear persisted and cached credentials.
    Logout,
    /// Show the current authentication status.
    Status,
}

/// Run an auth subcommand. Returns a process exit code.
pub async fn run(command: &AuthCommand, config: &AuthConfig) -> i32 {
    let manager = CredentialManager::new(config.clone());

    match command {
        AuthCommand::Login => finish(manager.authenticate().await),
        AuthCommand::Reauth => finish(manager.force_reauthenticate().await),
        AuthCommand::Logout => finish(manager.logout()),
        AuthCommand::Status => {
            let status = manager.offline_status();
            match serde_json::to_string_pretty(&status) {
                Ok(json) => {
                    println!("{json}");
                    0
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
    }
}

fn finish(result: ActionResult) -> i32 {
    if result.success {
        println!("{}", result.message);
        0
    } else {
        eprintln!("error: {}", result.message);
        1
    }
}
