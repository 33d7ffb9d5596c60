// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task entity and its state machine (spec §3 "Task", §4.3).

use crate::ids::{EngineId, JobId, TaskId};
use serde::{Deserialize, Serialize};

/// Fixed pipeline stage ordering (spec §4.1):
/// `prepare → transcribe → align → diarize → pii_detect → audio_redact → merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prepare,
    Transcribe,
    Align,
    Diarize,
    PiiDetect,
    AudioRedact,
    Merge,
}

impl Stage {
    /// All stages in fixed pipeline order.
    pub const ORDER: [Stage; 7] = [
        Stage::Prepare,
        Stage::Transcribe,
        Stage::Align,
        Stage::Diarize,
        Stage::PiiDetect,
        Stage::AudioRedact,
        Stage::Merge,
    ];

    pub fn ordinal(self) -> usize {
        Self::ORDER.iter().position(|s| *s == self).unwrap_or(usize::MAX)
    }
}

txctl_core::simple_display! {
    Stage {
        Prepare => "prepare",
        Transcribe => "transcribe",
        Align => "align",
        Diarize => "diarize",
        PiiDetect => "pii_detect",
        AudioRedact => "audio_redact",
        Merge => "merge",
    }
}

/// A task's status. Advances only monotonically (I1); terminal statuses
/// (`Completed`, `Failed` with retries exhausted, `Skipped`, `Cancelled`)
/// are never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    Running,
    /// Failed this attempt; scheduler will decide retry vs. terminal failure.
    Failed,
    Completed,
    /// Terminal: optional task exhausted retries, or its dependency chain
    /// made it unreachable.
    Skipped,
    Cancelled,
}

impl TaskStatus {
    /// Whether a task in this status can never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Skipped | TaskStatus::Cancelled)
            || self == TaskStatus::Failed
    }

    /// Whether this status counts as "satisfied" for a downstream
    /// dependency evaluation (spec I2): completed, or skipped when the
    /// edge declared `required_for_downstream = false`.
    pub fn satisfies_dependency(self, required_for_downstream: bool) -> bool {
        match self {
            TaskStatus::Completed => true,
            TaskStatus::Skipped if !required_for_downstream => true,
            _ => false,
        }
    }
}

txctl_core::simple_display! {
    TaskStatus {
        Pending => "pending",
        Ready => "ready",
        Running => "running",
        Failed => "failed",
        Completed => "completed",
        Skipped => "skipped",
        Cancelled => "cancelled",
    }
}

/// Presentation-only status shown in the job-status view (spec §4.3
/// "Stage-blocked visualization contract"). Never stored: derived at
/// read time from the real `TaskStatus` plus whether a required
/// upstream sibling failed terminally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatusView {
    Pending,
    Ready,
    Running,
    Failed,
    Completed,
    Skipped,
    Cancelled,
    /// Stored status is `Cancelled` or `Skipped`, but presentation wants to
    /// communicate "didn't run because a required upstream task failed".
    Blocked,
}

impl From<TaskStatus> for TaskStatusView {
    fn from(s: TaskStatus) -> Self {
        match s {
            TaskStatus::Pending => TaskStatusView::Pending,
            TaskStatus::Ready => TaskStatusView::Ready,
            TaskStatus::Running => TaskStatusView::Running,
            TaskStatus::Failed => TaskStatusView::Failed,
            TaskStatus::Completed => TaskStatusView::Completed,
            TaskStatus::Skipped => TaskStatusView::Skipped,
            TaskStatus::Cancelled => TaskStatusView::Cancelled,
        }
    }
}

/// A dependency edge. `required_for_downstream = false` marks an
/// "enriching" dependency (e.g. `diarize` feeding `pii_detect`): if the
/// upstream task is skipped, the downstream task still becomes ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub depends_on: TaskId,
    pub required_for_downstream: bool,
}

/// One node in a job's DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub job_id: JobId,
    pub stage: Stage,
    pub engine_id: EngineId,
    pub status: TaskStatus,
    /// Fails the whole job if exhausted; otherwise failure degrades to `Skipped`.
    pub required: bool,
    pub attempts: u32,
    pub max_retries: u32,
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_artifact_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_artifact_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<txctl_core::StageError>,
    pub correlation: txctl_core::Correlation,
}

impl Task {
    /// Whether every dependency edge of this task is currently satisfied
    /// given a lookup of dependency statuses (spec I2/P3).
    pub fn dependencies_satisfied(&self, status_of: impl Fn(TaskId) -> Option<TaskStatus>) -> bool {
        self.dependencies.iter().all(|edge| {
            status_of(edge.depends_on)
                .map(|s| s.satisfies_dependency(edge.required_for_downstream))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
