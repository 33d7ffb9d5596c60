// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `txctl jobs` - C7 Orchestrator Scheduler admin commands.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use tx_wire::{AdminQuery, AdminResponse, JobId, TaskId};

use crate::client::AdminClient;
use crate::output::{print_ok, OutputFormat};

#[derive(Subcommand)]
pub enum JobsCommand {
    /// Request cancellation of a job.
    Cancel {
        /// Job id (e.g. "job-abc123").
        job_id: String,
    },
    /// Reset a terminally-failed task and redispatch it.
    RetryTask {
        /// Job id the task belongs to.
        job_id: String,
        /// Task id to retry.
        task_id: String,
    },
}

impl JobsCommand {
    pub async fn run(self, client: &mut AdminClient, format: OutputFormat) -> Result<()> {
        match self {
            JobsCommand::Cancel { job_id } => {
                let job_id = JobId::from(job_id);
                let response = client.call(AdminQuery::JobsCancel { job_id }).await?;
                let AdminResponse::JobsCancelled { job_id } = response else {
                    return Err(anyhow!("unexpected daemon response"));
                };
                print_ok(&job_id, format, || format!("cancellation requested for {job_id}"));
                Ok(())
            }
            JobsCommand::RetryTask { job_id, task_id } => {
                let job_id = JobId::from(job_id);
                let task_id = TaskId::from(task_id);
                let response = client.call(AdminQuery::JobsRetryTask { job_id, task_id }).await?;
                let AdminResponse::JobsTaskRetryScheduled { job_id, task_id } = response else {
                    return Err(anyhow!("unexpected daemon response"));
                };
                print_ok(&(job_id, task_id), format, || format!("retry scheduled for {task_id} in {job_id}"));
                Ok(())
            }
        }
    }
}
