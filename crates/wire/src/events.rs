// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine ↔ Orchestrator wire shapes (spec §6) and the internal
//! pub/sub events the scheduler reducer (C7) subscribes to (spec §4.3).

use crate::ids::{EngineId, JobId, TaskId};
use crate::task::Stage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Task payload written to an engine's FIFO queue on dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub stage: Stage,
    pub engine_id: EngineId,
    pub audio_uri: String,
    /// Artifact URIs produced by already-completed upstream stages.
    pub prior_outputs: HashMap<Stage, String>,
    pub config: serde_json::Value,
    pub enqueued_at_ms: u64,
    pub correlation: txctl_core::Correlation,
}

/// Structured failure reported on a task completion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionErrorPayload {
    pub kind: txctl_core::ErrorKind,
    pub message: String,
    pub retryable: bool,
}

/// Task completion event published by the harness (C5) on pub/sub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletionEvent {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub status: TaskOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CompletionErrorPayload>,
    pub duration_ms: u64,
}

/// Terminal per-attempt outcome reported by the harness. Distinct from
/// [`crate::task::TaskStatus`]: the scheduler derives the task's actual
/// status (which may stay `Failed`-then-retry or become `Skipped`) from
/// this plus retry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Success,
    Failure,
}

/// Heartbeat payload published by an engine (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    pub engine_id: EngineId,
    pub status: crate::engine::EngineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<TaskId>,
    pub timestamp_ms: u64,
}

/// Events the Orchestrator Scheduler reducer (C7) subscribes to
/// (spec §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    JobCreated { job_id: JobId },
    TaskCompleted(TaskCompletionEvent),
    JobCancelRequested { job_id: JobId },
    EngineOffline { engine_id: EngineId },
}
