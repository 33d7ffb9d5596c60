// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `txctl`: admin CLI for the txd control-plane daemon (spec §6 "CLI
//! surface (control plane admin)").

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;

use client::AdminClient;
use commands::Command;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "txctl", version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")))]
struct Cli {
    /// Path to the daemon's admin socket (default: resolved the same
    /// way `txd` resolves it from `TXD_STATE_DIR`/`XDG_STATE_HOME`).
    #[arg(long, global = true)]
    socket: Option<std::path::PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let socket_path = cli.socket.unwrap_or_else(txd::env::socket_path);
    let mut client = AdminClient::connect(&socket_path).await?;

    match cli.command {
        Command::Engines { command } => command.run(&mut client, cli.format).await,
        Command::Jobs { command } => command.run(&mut client, cli.format).await,
        Command::Webhooks { command } => command.run(&mut client, cli.format).await,
        Command::Sessions { command } => command.run(&mut client, cli.format).await,
    }
}
