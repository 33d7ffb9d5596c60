// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tx-wire: DTOs and wire shapes for the transcription control plane.
//!
//! Internally-tagged enums (`#[serde(tag = "...")]`) throughout, matching
//! the IPC protocol convention this crate is grounded on. Nothing here
//! performs I/O; it is the shared vocabulary between the orchestrator,
//! registry, harness, realtime router, webhook dispatcher, daemon, and
//! CLI crates.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod admin;
pub mod audit;
pub mod engine;
pub mod events;
pub mod ids;
pub mod job;
pub mod progress;
pub mod realtime_protocol;
pub mod session;
pub mod task;
pub mod webhook;

pub use admin::{AdminQuery, AdminResponse};
pub use audit::{AuditAction, AuditEntry, AuditSubjectKind};
pub use engine::{EngineIdentity, EngineState, EngineStatus};
pub use events::{
    CompletionErrorPayload, HeartbeatEvent, SchedulerEvent, TaskCompletionEvent, TaskOutcome,
    TaskPayload,
};
pub use ids::{AuditId, DeliveryId, EndpointId, EngineId, JobId, SessionId, TaskId, TenantId, WorkerId};
pub use job::{Job, JobParameters, JobStatus, PiiDetectionTier, RedactionMode, RetentionPolicySnapshot,
    SpeakerDetection, TimestampGranularity};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use progress::{progress_channel, ProgressBusEvent, ProgressEvent, ProgressRecord};
pub use realtime_protocol::{ClientEvent, CloseCode, ServerEvent, TranscriptSegment, WordTiming};
pub use session::{RealtimeSession, RealtimeWorkerState, SessionStats, SessionStatus};
pub use task::{DependencyEdge, Stage, Task, TaskStatus, TaskStatusView};
pub use webhook::{DeliveryStatus, WebhookDelivery, WebhookEventType, RETRY_SCHEDULE_SECS};
