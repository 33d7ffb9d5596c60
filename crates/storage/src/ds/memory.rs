// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory reference adapter for [`super::DurableStore`].

use super::{Cursor, DsError, DurableStore, Page};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tx_wire::{
    AuditEntry, DeliveryId, DeliveryStatus, Job, JobId, JobStatus, RealtimeSession, SessionId, SessionStatus,
    Task, TaskId, TenantId, WebhookDelivery, WorkerId,
};

#[derive(Clone, Default)]
pub struct InMemoryDs {
    jobs: Arc<DashMap<JobId, Job>>,
    tasks: Arc<DashMap<TaskId, Task>>,
    tasks_by_job: Arc<DashMap<JobId, Vec<TaskId>>>,
    deliveries: Arc<DashMap<DeliveryId, WebhookDelivery>>,
    /// Rows currently claimed by a dispatcher and not yet released by a
    /// follow-up `put_delivery` call. Models skip-locked semantics
    /// without a real row-lock manager.
    in_flight: Arc<DashMap<DeliveryId, ()>>,
    audit: Arc<Mutex<Vec<AuditEntry>>>,
    sessions: Arc<DashMap<SessionId, RealtimeSession>>,
}

impl InMemoryDs {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for InMemoryDs {
    async fn create_job_with_tasks(&self, job: Job, tasks: Vec<Task>) -> Result<(), DsError> {
        let task_ids = tasks.iter().map(|t| t.id).collect();
        for task in tasks {
            self.tasks.insert(task.id, task);
        }
        self.tasks_by_job.insert(job.id, task_ids);
        self.jobs.insert(job.id, job);
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, DsError> {
        Ok(self.jobs.get(id).map(|j| j.clone()))
    }

    async fn put_job(&self, job: Job) -> Result<(), DsError> {
        self.jobs.insert(job.id, job);
        Ok(())
    }

    async fn list_jobs_by_tenant(
        &self,
        tenant: &TenantId,
        status: Option<JobStatus>,
        cursor: Cursor,
        limit: usize,
    ) -> Result<Page<Job>, DsError> {
        let mut matching: Vec<Job> = self
            .jobs
            .iter()
            .map(|e| e.value().clone())
            .filter(|j| &j.tenant == tenant)
            .filter(|j| status.map(|s| j.status == s).unwrap_or(true))
            .collect();
        matching.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms).then(a.id.as_str().cmp(b.id.as_str())));

        let offset: usize = cursor.0.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0);
        let items: Vec<Job> = matching.iter().skip(offset).take(limit).cloned().collect();
        let next_offset = offset + items.len();
        let next_cursor =
            if next_offset < matching.len() { Cursor(Some(next_offset.to_string())) } else { Cursor(None) };
        Ok(Page { items, next_cursor })
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, DsError> {
        Ok(self.tasks.get(id).map(|t| t.clone()))
    }

    async fn put_task(&self, task: Task) -> Result<(), DsError> {
        self.tasks.insert(task.id, task);
        Ok(())
    }

    async fn list_tasks_for_job(&self, job_id: &JobId) -> Result<Vec<Task>, DsError> {
        let Some(ids) = self.tasks_by_job.get(job_id) else { return Ok(Vec::new()) };
        Ok(ids.iter().filter_map(|id| self.tasks.get(id).map(|t| t.clone())).collect())
    }

    async fn put_delivery(&self, delivery: WebhookDelivery) -> Result<(), DsError> {
        self.in_flight.remove(&delivery.id);
        self.deliveries.insert(delivery.id, delivery);
        Ok(())
    }

    async fn get_delivery(&self, id: &DeliveryId) -> Result<Option<WebhookDelivery>, DsError> {
        Ok(self.deliveries.get(id).map(|d| d.clone()))
    }

    async fn claim_due_deliveries(&self, now_ms: u64, limit: usize) -> Result<Vec<WebhookDelivery>, DsError> {
        let mut claimed = Vec::new();
        for entry in self.deliveries.iter() {
            if claimed.len() >= limit {
                break;
            }
            let delivery = entry.value();
            if delivery.status != DeliveryStatus::Pending || delivery.next_retry_at_ms > now_ms {
                continue;
            }
            if self.in_flight.contains_key(&delivery.id) {
                continue; // another dispatcher already holds this row
            }
            self.in_flight.insert(delivery.id, ());
            claimed.push(delivery.clone());
        }
        Ok(claimed)
    }

    async fn list_deliveries(&self, status: Option<DeliveryStatus>) -> Result<Vec<WebhookDelivery>, DsError> {
        Ok(self
            .deliveries
            .iter()
            .map(|e| e.value().clone())
            .filter(|d| status.map(|s| d.status == s).unwrap_or(true))
            .collect())
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DsError> {
        self.audit.lock().push(entry);
        Ok(())
    }

    async fn list_audit_for_subject(&self, subject_id: &str) -> Result<Vec<AuditEntry>, DsError> {
        Ok(self.audit.lock().iter().filter(|e| e.subject_id == subject_id).cloned().collect())
    }

    async fn put_session(&self, session: RealtimeSession) -> Result<(), DsError> {
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<RealtimeSession>, DsError> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<RealtimeSession>, DsError> {
        Ok(self
            .sessions
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| status.map(|want| s.status == want).unwrap_or(true))
            .collect())
    }

    async fn list_active_sessions_for_worker(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<RealtimeSession>, DsError> {
        Ok(self
            .sessions
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| &s.worker_id == worker_id && s.status == SessionStatus::Active)
            .collect())
    }
}
