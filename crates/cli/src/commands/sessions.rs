// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `txctl sessions` - C9 Realtime Session Router admin commands.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use tx_wire::{AdminQuery, AdminResponse, SessionId};

use crate::client::AdminClient;
use crate::output::{print_ok, print_rows, OutputFormat};

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// List realtime sessions.
    List,
    /// Forcibly end a realtime session and release its worker slot.
    Terminate {
        /// Session id (e.g. "ses-abc123").
        session_id: String,
    },
}

impl SessionsCommand {
    pub async fn run(self, client: &mut AdminClient, format: OutputFormat) -> Result<()> {
        match self {
            SessionsCommand::List => {
                let response = client.call(AdminQuery::SessionsList).await?;
                let AdminResponse::SessionsList { sessions } = response else {
                    return Err(anyhow!("unexpected daemon response"));
                };
                print_rows(&sessions, format, |s| {
                    format!("{:<26} {:<10} {:<12} worker={}", s.id.to_string(), s.status.to_string(), s.language, s.worker_id)
                });
                Ok(())
            }
            SessionsCommand::Terminate { session_id } => {
                let session_id = SessionId::from(session_id);
                let response = client.call(AdminQuery::SessionsTerminate { session_id }).await?;
                let AdminResponse::SessionsTerminated { session_id } = response else {
                    return Err(anyhow!("unexpected daemon response"));
                };
                print_ok(&session_id, format, || format!("terminated {session_id}"));
                Ok(())
            }
        }
    }
}
