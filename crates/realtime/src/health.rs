// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime worker health loop (spec §4.5 "Health loop").
//!
//! Every tick, marks any worker with a stale heartbeat offline, fans
//! `interrupted` out to every session still bound to it, and publishes
//! `worker.offline:{session_id}` so the (out-of-scope) gateway can send
//! a `session.terminated` frame with a recovery hint.

use crate::worker_registry::RealtimeWorkerRegistry;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tx_storage::{DurableStore, KvStore};
use tx_wire::SessionStatus;

pub struct SessionHealthLoop<R, D, K, C> {
    workers: R,
    store: D,
    kv: K,
    clock: C,
    interval: Duration,
    stale_after: Duration,
}

impl<R, D, K, C> SessionHealthLoop<R, D, K, C>
where
    R: RealtimeWorkerRegistry,
    D: DurableStore,
    K: KvStore,
    C: txctl_core::Clock,
{
    pub fn new(workers: R, store: D, kv: K, clock: C) -> Self {
        Self { workers, store, kv, clock, interval: crate::T_HEALTH_LOOP, stale_after: crate::T_WORKER_STALE }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Runs one health-check pass, returning the number of sessions
    /// newly marked `interrupted`.
    pub async fn tick_once(&self) -> Result<u32, crate::RouterError> {
        use txctl_core::Clock;
        let now_ms = self.clock.epoch_ms();
        let mut interrupted = 0;

        for worker in self.workers.list_workers().await? {
            if !worker.is_fresh(now_ms, self.stale_after.as_millis() as u64) {
                self.workers.mark_offline(&worker.worker_id).await?;
                warn!(worker_id = %worker.worker_id, "realtime worker marked offline by health loop");

                for mut session in self.store.list_active_sessions_for_worker(&worker.worker_id).await? {
                    session.status = SessionStatus::Interrupted;
                    session.ended_at_ms = Some(now_ms);
                    let session_id = session.id;
                    self.store.put_session(session).await?;
                    // Force-interrupting a session releases its slot just
                    // like a normal `release()` would (I5): otherwise a
                    // worker that comes back live keeps a permanently
                    // inflated `active_sessions` count for sessions that
                    // will never call release themselves.
                    self.workers.release(&worker.worker_id).await?;
                    let _ = self
                        .kv
                        .publish(
                            &format!("worker.offline:{session_id}"),
                            serde_json::json!({ "worker_id": worker.worker_id.as_str(), "session_id": session_id.to_string() }),
                        )
                        .await;
                    interrupted += 1;
                }
            }
        }
        Ok(interrupted)
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick_once().await {
                        Ok(count) if count > 0 => info!(count, "realtime sessions interrupted by health loop"),
                        Ok(_) => {}
                        Err(err) => warn!(error = %err, "realtime health loop tick failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
