// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit log entry (spec §3 I7, §7 "unrecoverable errors
//! write an entry to the audit log").

use crate::ids::AuditId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    JobCreated,
    JobCompleted,
    JobFailed,
    JobCancelled,
    JobDeleted,
    TaskFailedTerminal,
    WebhookDead,
}

txctl_core::simple_display! {
    AuditAction {
        JobCreated => "job_created",
        JobCompleted => "job_completed",
        JobFailed => "job_failed",
        JobCancelled => "job_cancelled",
        JobDeleted => "job_deleted",
        TaskFailedTerminal => "task_failed_terminal",
        WebhookDead => "webhook_dead",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSubjectKind {
    Job,
    Task,
    Webhook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub occurred_at_ms: u64,
    pub actor: String,
    pub action: AuditAction,
    pub subject_kind: AuditSubjectKind,
    pub subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub correlation: txctl_core::Correlation,
}
