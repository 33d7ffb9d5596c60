// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin CLI surface contracts (spec §6 "CLI surface (control plane
//! admin)"). Names are contracts, not syntax: the `txctl` binary and the
//! daemon's admin listener exchange these over the daemon's IPC
//! transport as a length-prefixed `Query`/`Response` pair.

use crate::engine::EngineState;
use crate::ids::{DeliveryId, EngineId, JobId, SessionId, TaskId};
use crate::session::RealtimeSession;
use crate::webhook::WebhookDelivery;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AdminQuery {
    EnginesList { #[serde(default)] stage: Option<crate::task::Stage> },
    EnginesDrain { engine_id: EngineId },
    JobsCancel { job_id: JobId },
    JobsRetryTask { job_id: JobId, task_id: TaskId },
    WebhooksDeliveriesList { #[serde(default)] status: Option<crate::webhook::DeliveryStatus> },
    SessionsList,
    SessionsTerminate { session_id: SessionId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AdminResponse {
    EnginesList { engines: Vec<EngineState> },
    EnginesDrained { engine_id: EngineId },
    JobsCancelled { job_id: JobId },
    JobsTaskRetryScheduled { job_id: JobId, task_id: TaskId },
    WebhooksDeliveriesList { deliveries: Vec<WebhookDelivery> },
    SessionsList { sessions: Vec<RealtimeSession> },
    SessionsTerminated { session_id: SessionId },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryRow {
    pub id: DeliveryId,
    pub event_type: crate::webhook::WebhookEventType,
    pub status: crate::webhook::DeliveryStatus,
    pub attempts: u32,
}
