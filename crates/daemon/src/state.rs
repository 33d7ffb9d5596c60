// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin query dispatch: maps every [`AdminQuery`] variant to the
//! control-plane component that owns the answer, and shapes the result
//! back into an [`AdminResponse`] (spec §6 "CLI surface").
//!
//! Every component here stays the sole writer of its own state (I4/I5):
//! `EnginesDrain` does not flip an engine's status directly, it publishes
//! the drain advisory the engine's own heartbeat loop is expected to act
//! on, the same way the scheduler only ever mutates jobs/tasks through
//! its reducer.

use tx_registry::EngineRegistry;
use tx_storage::{DurableStore, KvStore};
use tx_wire::{AdminQuery, AdminResponse};
use txctl_core::Clock;

use tx_orchestrator::{Scheduler, SchedulerError};
use tx_realtime::{RouterError, SessionRouter};

type AppScheduler = Scheduler<
    tx_storage::InMemoryDs,
    tx_storage::InMemoryKv,
    tx_registry::KvEngineRegistry<tx_storage::InMemoryKv>,
    txctl_core::SystemClock,
>;

type AppRouter = SessionRouter<tx_realtime::KvWorkerRegistry<tx_storage::InMemoryKv>, tx_storage::InMemoryDs>;

/// Bundles every handle the admin listener needs to answer a query.
/// Cheaply cloned: every field is itself a cheap handle onto shared
/// state (`Arc`/`DashMap`-backed), so a clone can be handed to each
/// connection task.
#[derive(Clone)]
pub struct AppState {
    pub kv: tx_storage::InMemoryKv,
    pub store: tx_storage::InMemoryDs,
    pub registry: tx_registry::KvEngineRegistry<tx_storage::InMemoryKv>,
    pub scheduler: std::sync::Arc<AppScheduler>,
    pub router: std::sync::Arc<AppRouter>,
    pub clock: txctl_core::SystemClock,
}

impl AppState {
    pub async fn handle(&self, query: AdminQuery) -> AdminResponse {
        let result = match query {
            AdminQuery::EnginesList { stage } => self.engines_list(stage).await,
            AdminQuery::EnginesDrain { engine_id } => self.engines_drain(engine_id).await,
            AdminQuery::JobsCancel { job_id } => self.jobs_cancel(job_id).await,
            AdminQuery::JobsRetryTask { job_id, task_id } => self.jobs_retry_task(job_id, task_id).await,
            AdminQuery::WebhooksDeliveriesList { status } => self.webhooks_deliveries_list(status).await,
            AdminQuery::SessionsList => self.sessions_list().await,
            AdminQuery::SessionsTerminate { session_id } => self.sessions_terminate(session_id).await,
        };
        result.unwrap_or_else(|message| AdminResponse::Error { message })
    }

    async fn engines_list(&self, stage: Option<tx_wire::Stage>) -> Result<AdminResponse, String> {
        let stages = match stage {
            Some(s) => vec![s],
            None => tx_wire::Stage::ORDER.to_vec(),
        };
        let mut engines = Vec::new();
        for stage in stages {
            engines.extend(self.registry.engines_for_stage(stage).await.map_err(|e| e.to_string())?);
        }
        Ok(AdminResponse::EnginesList { engines })
    }

    /// Drains do not flip registry state directly (only the engine's own
    /// heartbeat does that, I4); this publishes the advisory over the
    /// `engine.drain` channel and reports success once the message is
    /// accepted, regardless of whether anything is subscribed.
    async fn engines_drain(&self, engine_id: tx_wire::EngineId) -> Result<AdminResponse, String> {
        let payload = serde_json::json!({ "engine_id": engine_id.as_str() });
        let _ = self.kv.publish("engine.drain", payload).await;
        Ok(AdminResponse::EnginesDrained { engine_id })
    }

    async fn jobs_cancel(&self, job_id: tx_wire::JobId) -> Result<AdminResponse, String> {
        self.scheduler.request_cancel(job_id).await.map_err(scheduler_err)?;
        Ok(AdminResponse::JobsCancelled { job_id })
    }

    async fn jobs_retry_task(&self, job_id: tx_wire::JobId, task_id: tx_wire::TaskId) -> Result<AdminResponse, String> {
        self.scheduler.retry_task(job_id, task_id).await.map_err(scheduler_err)?;
        Ok(AdminResponse::JobsTaskRetryScheduled { job_id, task_id })
    }

    async fn webhooks_deliveries_list(
        &self,
        status: Option<tx_wire::DeliveryStatus>,
    ) -> Result<AdminResponse, String> {
        let deliveries = self.store.list_deliveries(status).await.map_err(|e| e.to_string())?;
        Ok(AdminResponse::WebhooksDeliveriesList { deliveries })
    }

    async fn sessions_list(&self) -> Result<AdminResponse, String> {
        let sessions = self.store.list_sessions(None).await.map_err(|e| e.to_string())?;
        Ok(AdminResponse::SessionsList { sessions })
    }

    async fn sessions_terminate(&self, session_id: tx_wire::SessionId) -> Result<AdminResponse, String> {
        let now_ms = self.clock.epoch_ms();
        let session = self
            .store
            .get_session(&session_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("session {session_id} not found"))?;
        self.router
            .release(&session_id, tx_wire::SessionStatus::Interrupted, session.stats, now_ms, None, None)
            .await
            .map_err(router_err)?;
        Ok(AdminResponse::SessionsTerminated { session_id })
    }
}

fn scheduler_err(e: SchedulerError) -> String {
    e.to_string()
}

fn router_err(e: RouterError) -> String {
    e.to_string()
}
