// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tx_wire::{
    DeliveryId, DeliveryStatus, EndpointId, Job, JobBuilder, RealtimeSession, SessionId, SessionStats,
    SessionStatus, WebhookDelivery, WebhookEventType, WorkerId,
};

fn job_with(tenant: &str, status: JobStatus, created_at_ms: u64) -> Job {
    Job::builder().tenant(TenantId::from(tenant)).status(status).created_at_ms(created_at_ms).build()
}

#[tokio::test]
async fn create_job_with_tasks_persists_both() {
    let ds = InMemoryDs::new();
    let job = job_with("acme", JobStatus::Pending, 1);
    ds.create_job_with_tasks(job.clone(), vec![]).await.unwrap();
    assert_eq!(ds.get_job(&job.id).await.unwrap(), Some(job));
}

#[tokio::test]
async fn list_jobs_by_tenant_filters_and_paginates() {
    let ds = InMemoryDs::new();
    for i in 0..5u64 {
        let job = job_with("acme", JobStatus::Pending, i);
        ds.create_job_with_tasks(job, vec![]).await.unwrap();
    }
    let other_tenant = job_with("globex", JobStatus::Pending, 0);
    ds.create_job_with_tasks(other_tenant, vec![]).await.unwrap();

    let page1 =
        ds.list_jobs_by_tenant(&TenantId::from("acme"), None, Cursor::default(), 2).await.unwrap();
    assert_eq!(page1.items.len(), 2);
    assert!(page1.next_cursor.0.is_some());

    let page2 = ds
        .list_jobs_by_tenant(&TenantId::from("acme"), None, page1.next_cursor, 2)
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 2);

    let page3 = ds
        .list_jobs_by_tenant(&TenantId::from("acme"), None, page2.next_cursor, 2)
        .await
        .unwrap();
    assert_eq!(page3.items.len(), 1);
    assert_eq!(page3.next_cursor, Cursor(None));
}

#[tokio::test]
async fn list_jobs_by_tenant_filters_by_status() {
    let ds = InMemoryDs::new();
    ds.create_job_with_tasks(job_with("acme", JobStatus::Completed, 0), vec![]).await.unwrap();
    ds.create_job_with_tasks(job_with("acme", JobStatus::Failed, 1), vec![]).await.unwrap();

    let page = ds
        .list_jobs_by_tenant(&TenantId::from("acme"), Some(JobStatus::Failed), Cursor::default(), 10)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].status, JobStatus::Failed);
}

fn delivery(status: DeliveryStatus, next_retry_at_ms: u64) -> WebhookDelivery {
    WebhookDelivery {
        id: DeliveryId::new(),
        endpoint_id: EndpointId::new(),
        url_override: None,
        event_type: WebhookEventType::JobCompleted,
        payload: serde_json::json!({}),
        status,
        attempts: 0,
        next_retry_at_ms,
        last_status_code: None,
        last_error: None,
    }
}

#[tokio::test]
async fn claim_due_deliveries_skips_future_and_non_pending() {
    let ds = InMemoryDs::new();
    let due = delivery(DeliveryStatus::Pending, 100);
    let future = delivery(DeliveryStatus::Pending, 999_999);
    let delivered = delivery(DeliveryStatus::Delivered, 0);
    ds.put_delivery(due.clone()).await.unwrap();
    ds.put_delivery(future).await.unwrap();
    ds.put_delivery(delivered).await.unwrap();

    let claimed = ds.claim_due_deliveries(200, 10).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, due.id);
}

#[tokio::test]
async fn claimed_delivery_is_skip_locked_until_released() {
    let ds = InMemoryDs::new();
    let due = delivery(DeliveryStatus::Pending, 0);
    ds.put_delivery(due.clone()).await.unwrap();

    let first_claim = ds.claim_due_deliveries(1_000, 10).await.unwrap();
    assert_eq!(first_claim.len(), 1);

    // A second dispatcher racing the same claim sees nothing: the row
    // is locked until the first dispatcher calls put_delivery.
    let second_claim = ds.claim_due_deliveries(1_000, 10).await.unwrap();
    assert!(second_claim.is_empty());

    let mut updated = first_claim.into_iter().next().unwrap();
    updated.status = DeliveryStatus::Delivered;
    ds.put_delivery(updated).await.unwrap();

    let after_release = ds.claim_due_deliveries(1_000, 10).await.unwrap();
    assert!(after_release.is_empty(), "delivered rows are never claimable again");
}

#[tokio::test]
async fn audit_log_is_append_only_and_queryable_by_subject() {
    let ds = InMemoryDs::new();
    let entry = AuditEntry {
        id: tx_wire::AuditId::new(),
        occurred_at_ms: 1,
        actor: "scheduler".to_string(),
        action: tx_wire::AuditAction::JobFailed,
        subject_kind: tx_wire::AuditSubjectKind::Job,
        subject_id: "job-1".to_string(),
        detail: None,
        correlation: txctl_core::Correlation::new("req", "trace"),
    };
    ds.append_audit(entry.clone()).await.unwrap();
    let found = ds.list_audit_for_subject("job-1").await.unwrap();
    assert_eq!(found, vec![entry]);
    assert!(ds.list_audit_for_subject("job-2").await.unwrap().is_empty());
}

fn session(worker_id: WorkerId, status: SessionStatus) -> RealtimeSession {
    RealtimeSession {
        id: SessionId::new(),
        tenant: TenantId::from("acme"),
        worker_id,
        language: "en".to_string(),
        model_tier: "fast".to_string(),
        encoding: "pcm16".to_string(),
        sample_rate_hz: 16_000,
        status,
        previous_session_id: None,
        stats: SessionStats::default(),
        started_at_ms: 0,
        ended_at_ms: None,
        stored_audio_uri: None,
        transcript_uri: None,
        enhancement_job_id: None,
    }
}

#[tokio::test]
async fn put_and_get_session_round_trips() {
    let ds = InMemoryDs::new();
    let s = session(WorkerId::new(), SessionStatus::Active);
    ds.put_session(s.clone()).await.unwrap();
    assert_eq!(ds.get_session(&s.id).await.unwrap(), Some(s));
}

#[tokio::test]
async fn list_sessions_filters_by_status() {
    let ds = InMemoryDs::new();
    ds.put_session(session(WorkerId::new(), SessionStatus::Active)).await.unwrap();
    ds.put_session(session(WorkerId::new(), SessionStatus::Interrupted)).await.unwrap();

    let active = ds.list_sessions(Some(SessionStatus::Active)).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].status, SessionStatus::Active);

    assert_eq!(ds.list_sessions(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn list_active_sessions_for_worker_excludes_other_workers_and_terminal() {
    let ds = InMemoryDs::new();
    let worker_a = WorkerId::new();
    let worker_b = WorkerId::new();
    let bound = session(worker_a.clone(), SessionStatus::Active);
    ds.put_session(bound.clone()).await.unwrap();
    ds.put_session(session(worker_a.clone(), SessionStatus::Completed)).await.unwrap();
    ds.put_session(session(worker_b, SessionStatus::Active)).await.unwrap();

    let bound_sessions = ds.list_active_sessions_for_worker(&worker_a).await.unwrap();
    assert_eq!(bound_sessions, vec![bound]);
}
