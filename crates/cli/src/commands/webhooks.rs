// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `txctl webhooks` - C10 Webhook Dispatcher admin commands.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use tx_wire::{AdminQuery, AdminResponse, DeliveryStatus};

use crate::client::AdminClient;
use crate::output::{print_rows, OutputFormat};

#[derive(Subcommand)]
pub enum WebhooksCommand {
    /// Inspect webhook delivery rows.
    Deliveries {
        #[command(subcommand)]
        command: DeliveriesCommand,
    },
}

#[derive(Subcommand)]
pub enum DeliveriesCommand {
    /// List deliveries, optionally filtered by status.
    List {
        /// One of: pending, delivered, failed, dead.
        #[arg(long)]
        status: Option<String>,
    },
}

impl WebhooksCommand {
    pub async fn run(self, client: &mut AdminClient, format: OutputFormat) -> Result<()> {
        match self {
            WebhooksCommand::Deliveries { command: DeliveriesCommand::List { status } } => {
                let status = status.map(|s| parse_status(&s)).transpose()?;
                let response = client.call(AdminQuery::WebhooksDeliveriesList { status }).await?;
                let AdminResponse::WebhooksDeliveriesList { deliveries } = response else {
                    return Err(anyhow!("unexpected daemon response"));
                };
                print_rows(&deliveries, format, |d| {
                    format!(
                        "{:<26} {:<10} {:<10} attempts={} next_retry_at_ms={}",
                        d.id.to_string(),
                        d.event_type.to_string(),
                        d.status.to_string(),
                        d.attempts,
                        d.next_retry_at_ms
                    )
                });
                Ok(())
            }
        }
    }
}

fn parse_status(s: &str) -> Result<DeliveryStatus> {
    match s {
        "pending" => Ok(DeliveryStatus::Pending),
        "delivered" => Ok(DeliveryStatus::Delivered),
        "failed" => Ok(DeliveryStatus::Failed),
        "dead" => Ok(DeliveryStatus::Dead),
        other => Err(anyhow!("unknown delivery status {other:?}, expected one of: pending, delivered, failed, dead")),
    }
}
