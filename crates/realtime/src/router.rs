// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `acquire_worker` allocation algorithm, session release, and soft
//! resume (spec §4.5).

use crate::worker_registry::{RealtimeWorkerRegistry, WorkerRegistryError};
use thiserror::Error;
use tracing::info;
use tx_storage::{DsError, DurableStore};
use tx_wire::{
    EngineStatus, RealtimeSession, SessionId, SessionStats, SessionStatus, TenantId, WorkerId,
};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("worker registry error: {0}")]
    WorkerRegistry(#[from] WorkerRegistryError),
    #[error("durable store error: {0}")]
    Store(#[from] DsError),
    #[error("no capacity: no live worker has a free slot for the requested language/model")]
    NoCapacity,
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
}

/// Parameters for an `acquire_worker` call (spec §4.5 step 1).
pub struct AcquireWorkerRequest {
    pub tenant: TenantId,
    pub language: String,
    pub model_tier: String,
    pub encoding: String,
    pub sample_rate_hz: u32,
    /// Links the new session to a prior one for later post-processing
    /// merge; transfers no runtime state (spec "Soft resume").
    pub resume_session_id: Option<SessionId>,
}

/// Result of a successful allocation (spec §4.5 step 5).
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub worker_id: WorkerId,
    pub endpoint: String,
    pub session_id: SessionId,
}

/// C9 Realtime Session Router.
pub struct SessionRouter<R, D> {
    workers: R,
    store: D,
    stale_after_ms: u64,
}

impl<R, D> SessionRouter<R, D>
where
    R: RealtimeWorkerRegistry,
    D: DurableStore,
{
    pub fn new(workers: R, store: D) -> Self {
        Self { workers, store, stale_after_ms: crate::T_WORKER_STALE.as_millis() as u64 }
    }

    pub fn with_stale_after_ms(mut self, stale_after_ms: u64) -> Self {
        self.stale_after_ms = stale_after_ms;
        self
    }

    /// Allocates a worker for a new (or soft-resumed) session (spec
    /// §4.5 steps 1-5).
    pub async fn acquire_worker(
        &self,
        request: AcquireWorkerRequest,
        now_ms: u64,
    ) -> Result<Allocation, RouterError> {
        let candidates = self.workers.list_workers().await?;

        // Filter by liveness, capacity, and capability match, then pick
        // the candidate with the most available slots; ties broken by
        // earliest registration (stable) — spec §4.5 steps 2-3.
        let mut eligible: Vec<_> = candidates
            .into_iter()
            .filter(|w| matches!(w.status, EngineStatus::Idle | EngineStatus::Processing))
            .filter(|w| w.is_fresh(now_ms, self.stale_after_ms))
            .filter(|w| w.has_free_capacity())
            .filter(|w| w.supports_language(&request.language))
            .filter(|w| w.supports_model(&request.model_tier))
            .collect();

        eligible.sort_by(|a, b| {
            b.available_slots()
                .cmp(&a.available_slots())
                .then(a.registered_at_ms.cmp(&b.registered_at_ms))
        });

        let Some(chosen) = eligible.into_iter().next() else {
            return Err(RouterError::NoCapacity);
        };

        // The sort picked a candidate optimistically; the increment is
        // the actual atomic admission decision (I5). If a racing caller
        // filled the last slot between our read and this call, fall
        // through to NoCapacity rather than retrying against a now-stale
        // candidate list — the gateway's caller retries with its own
        // backoff per spec §4.5 "no_capacity error and a suggested
        // retry delay".
        if !self.workers.try_acquire(&chosen.worker_id).await? {
            return Err(RouterError::NoCapacity);
        }

        let session = RealtimeSession {
            id: SessionId::new(),
            tenant: request.tenant,
            worker_id: chosen.worker_id,
            language: request.language,
            model_tier: request.model_tier,
            encoding: request.encoding,
            sample_rate_hz: request.sample_rate_hz,
            status: SessionStatus::Active,
            previous_session_id: request.resume_session_id,
            stats: SessionStats::default(),
            started_at_ms: now_ms,
            ended_at_ms: None,
            stored_audio_uri: None,
            transcript_uri: None,
            enhancement_job_id: None,
        };
        self.store.put_session(session.clone()).await?;
        info!(
            session_id = %session.id,
            worker_id = %chosen.worker_id,
            resumed_from = ?request.resume_session_id,
            "realtime session allocated"
        );

        Ok(Allocation { worker_id: chosen.worker_id, endpoint: chosen.endpoint, session_id: session.id })
    }

    /// Releases a session's worker slot and marks the session terminal
    /// (spec §4.5 "Release").
    pub async fn release(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
        stats: SessionStats,
        ended_at_ms: u64,
        stored_audio_uri: Option<String>,
        transcript_uri: Option<String>,
    ) -> Result<(), RouterError> {
        debug_assert!(status.is_terminal(), "release must set a terminal session status");
        let Some(mut session) = self.store.get_session(session_id).await? else {
            return Err(RouterError::SessionNotFound(*session_id));
        };
        if session.status.is_terminal() {
            // Idempotent: a session already released (e.g. by the
            // health loop marking it interrupted) is not released twice.
            return Ok(());
        }
        self.workers.release(&session.worker_id).await?;
        session.status = status;
        session.stats = stats;
        session.ended_at_ms = Some(ended_at_ms);
        session.stored_audio_uri = stored_audio_uri;
        session.transcript_uri = transcript_uri;
        self.store.put_session(session).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
