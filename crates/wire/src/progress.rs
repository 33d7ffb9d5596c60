// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress Bus payloads (spec §3 "Progress Record", §4.7, §6).

use crate::ids::{JobId, TaskId};
use crate::task::Stage;
use serde::{Deserialize, Serialize};

/// Pub/sub channel a job's progress events (task + job lifecycle) are
/// published on, subscribed to by the C8 push surface (spec §4.7). The
/// scheduler (C7) and the engine harness (C5) both publish here so a
/// single per-job subscription sees the whole event stream.
pub fn progress_channel(job_id: JobId) -> String {
    format!("progress:{job_id}")
}

/// Ephemeral per-task progress record, written by the harness (C5) and
/// TTL'd in the KV coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub task_id: TaskId,
    pub percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at_ms: u64,
}

impl ProgressRecord {
    pub fn new(task_id: TaskId, percent: u8, message: Option<String>, updated_at_ms: u64) -> Self {
        Self { task_id, percent: percent.min(100), message, updated_at_ms }
    }
}

/// Wire shape of a progress event published on the progress bus
/// (spec §6 "Progress event").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub stage: Stage,
    pub percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at_ms: u64,
}

/// Events the push surface (server-sent stream) forwards for a job,
/// per spec §4.7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressBusEvent {
    /// Synthetic snapshot emitted immediately on stream connect.
    Snapshot { job: crate::job::Job, tasks: Vec<crate::task::Task> },
    TaskStarted { task_id: TaskId, job_id: JobId },
    TaskProgress(ProgressEvent),
    TaskCompleted { task_id: TaskId, job_id: JobId, status: crate::task::TaskStatus },
    TaskFailed { task_id: TaskId, job_id: JobId, error: txctl_core::StageError },
    JobCompleted { job_id: JobId },
    JobFailed { job_id: JobId, error: String },
}
