// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `txctl` subcommands, one module per admin entity (spec §6 "CLI
//! surface").

pub mod engines;
pub mod jobs;
pub mod sessions;
pub mod webhooks;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Inspect and drain batch engines (C4).
    Engines {
        #[command(subcommand)]
        command: engines::EnginesCommand,
    },
    /// Cancel jobs and retry failed tasks (C7).
    Jobs {
        #[command(subcommand)]
        command: jobs::JobsCommand,
    },
    /// Inspect webhook deliveries (C10).
    Webhooks {
        #[command(subcommand)]
        command: webhooks::WebhooksCommand,
    },
    /// Inspect and terminate realtime sessions (C9).
    Sessions {
        #[command(subcommand)]
        command: sessions::SessionsCommand,
    },
}
