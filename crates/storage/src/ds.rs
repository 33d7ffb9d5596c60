// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C2 Durable Store contract (spec §6).
//!
//! Transactional store of record for jobs, tasks, engine identities,
//! retention policy snapshots, and the audit log. The contract is
//! expressed as entity-scoped operations (rather than a single generic
//! row abstraction) because every consumer in this codebase only ever
//! needs job/task/webhook/audit access patterns — secondary indexes on
//! `tenant_id`/`status`/`created_at`, cursor pagination, and skip-locked
//! claims are each represented by the method that needs them.

use async_trait::async_trait;
use thiserror::Error;
use tx_wire::{
    AuditEntry, DeliveryId, Job, JobId, JobStatus, RealtimeSession, SessionId, SessionStatus, Task, TaskId,
    TenantId, WebhookDelivery, WorkerId,
};

#[derive(Debug, Error)]
pub enum DsError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transaction conflict on {0}")]
    Conflict(String),
    #[error("deadline exceeded after 60s")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Opaque pagination cursor. Callers round-trip it verbatim; in-memory
/// implementation encodes it as the next offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor(pub Option<String>);

pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Cursor,
}

#[async_trait]
pub trait DurableStore: Send + Sync {
    // --- Jobs ---
    /// Writes a Job and its initial Task rows in a single transaction,
    /// as the scheduler does when a DAG is built (spec §4.3 dispatch
    /// step 2: "single transaction with the derived job progress").
    async fn create_job_with_tasks(&self, job: Job, tasks: Vec<Task>) -> Result<(), DsError>;
    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, DsError>;
    /// Replaces the stored Job row. Callers are responsible for only
    /// ever moving `status` forward (I1); this layer does not enforce it.
    async fn put_job(&self, job: Job) -> Result<(), DsError>;
    async fn list_jobs_by_tenant(
        &self,
        tenant: &TenantId,
        status: Option<JobStatus>,
        cursor: Cursor,
        limit: usize,
    ) -> Result<Page<Job>, DsError>;

    // --- Tasks ---
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, DsError>;
    async fn put_task(&self, task: Task) -> Result<(), DsError>;
    async fn list_tasks_for_job(&self, job_id: &JobId) -> Result<Vec<Task>, DsError>;

    // --- Webhook deliveries ---
    async fn put_delivery(&self, delivery: WebhookDelivery) -> Result<(), DsError>;
    async fn get_delivery(&self, id: &DeliveryId) -> Result<Option<WebhookDelivery>, DsError>;
    /// Claims up to `limit` pending deliveries whose `next_retry_at_ms`
    /// has elapsed, using skip-locked semantics: a delivery already
    /// claimed by a concurrent caller is skipped rather than awaited
    /// (spec §4.6, §5 "Webhook row claims use skip-locked selects").
    async fn claim_due_deliveries(&self, now_ms: u64, limit: usize) -> Result<Vec<WebhookDelivery>, DsError>;
    async fn list_deliveries(&self, status: Option<tx_wire::DeliveryStatus>) -> Result<Vec<WebhookDelivery>, DsError>;

    // --- Audit log (append-only, I7) ---
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DsError>;
    async fn list_audit_for_subject(&self, subject_id: &str) -> Result<Vec<AuditEntry>, DsError>;

    // --- Realtime sessions (spec §3 "Realtime Session") ---
    async fn put_session(&self, session: RealtimeSession) -> Result<(), DsError>;
    async fn get_session(&self, id: &SessionId) -> Result<Option<RealtimeSession>, DsError>;
    async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<RealtimeSession>, DsError>;
    /// Non-terminal sessions currently bound to `worker_id`, used by the
    /// health loop to fan `interrupted` out to every affected session
    /// when a worker goes offline (spec §4.5 "Health loop").
    async fn list_active_sessions_for_worker(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<RealtimeSession>, DsError>;
}

pub mod memory;
pub use memory::InMemoryDs;

#[cfg(test)]
#[path = "ds_tests.rs"]
mod tests;
