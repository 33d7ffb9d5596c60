// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `txctl engines` - C4 Engine Registry admin commands.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use tx_wire::{AdminQuery, AdminResponse, EngineId, Stage};

use crate::client::AdminClient;
use crate::output::{print_ok, print_rows, OutputFormat};

#[derive(Subcommand)]
pub enum EnginesCommand {
    /// List registered engines, optionally filtered by stage.
    List {
        /// Only show engines implementing this stage (e.g. "transcribe").
        #[arg(long)]
        stage: Option<String>,
    },
    /// Advise an engine to stop accepting new work.
    Drain {
        /// Engine id as registered (e.g. "whisper-large-v3").
        engine_id: String,
    },
}

impl EnginesCommand {
    pub async fn run(self, client: &mut AdminClient, format: OutputFormat) -> Result<()> {
        match self {
            EnginesCommand::List { stage } => {
                let stage = stage.map(|s| parse_stage(&s)).transpose()?;
                let response = client.call(AdminQuery::EnginesList { stage }).await?;
                let AdminResponse::EnginesList { engines } = response else {
                    return Err(anyhow!("unexpected daemon response"));
                };
                print_rows(&engines, format, |e| {
                    format!("{:<28} {:<12} {}", e.engine_id.as_str(), e.status.to_string(), e.queue_name)
                });
                Ok(())
            }
            EnginesCommand::Drain { engine_id } => {
                let engine_id = EngineId::from(engine_id);
                let response = client.call(AdminQuery::EnginesDrain { engine_id: engine_id.clone() }).await?;
                print_ok(&response, format, || format!("draining {}", engine_id.as_str()));
                Ok(())
            }
        }
    }
}

fn parse_stage(s: &str) -> Result<Stage> {
    Stage::ORDER
        .iter()
        .copied()
        .find(|stage| stage.to_string() == s)
        .ok_or_else(|| anyhow!("unknown stage {s:?}, expected one of: prepare, transcribe, align, diarize, pii_detect, audio_redact, merge"))
}
