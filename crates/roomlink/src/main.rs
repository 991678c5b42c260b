// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use roomlink::command::auth::AuthCommand;
use roomlink::config::AuthConfig;

/// Credential manager for the Chatwire bearer-token API.
#[derive(Debug, Parser)]
#[command(name = "roomlink", version, about)]
struct Cli {
    /// Log filter (tracing env-filter syntax).
    #[arg(long, env = "ROOMLINK_LOG", default_value = "info")]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, env = "ROOMLINK_LOG_FORMAT", default_value = "text")]
    log_format: String,

    #[command(flatten)]
    auth: AuthConfig,

    #[command(subcommand)]
    command: AuthCommand,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    // reqwest's rustls build needs a process-wide crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let code = roomlink::command::auth::run(&cli.command, &cli.auth).await;
    std::process::exit(code);
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Diagnostics go to stderr; stdout carries the structured command result.
    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}
