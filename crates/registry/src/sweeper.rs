// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background sweeper that marks stale engines offline (spec §4.2).

use crate::{EngineRegistry, T_HEARTBEAT_STALE};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tx_storage::KvStore;
use tx_wire::{EngineStatus, SchedulerEvent, Stage};

/// Periodically scans every stage's engine set and conditional-sets any
/// engine whose heartbeat has gone stale to `offline`, publishing
/// `engine.offline` so scheduler-side dispatch stops choosing it
/// (spec §4.2, §5 "Sweeper uses a conditional set ... to avoid racing a
/// resurrected engine").
pub struct StaleEngineSweeper<R, K, C> {
    registry: R,
    kv: K,
    clock: C,
    interval: Duration,
    stale_after: Duration,
}

impl<R, K, C> StaleEngineSweeper<R, K, C>
where
    R: EngineRegistry,
    K: KvStore,
    C: txctl_core::Clock,
{
    pub fn new(registry: R, kv: K, clock: C) -> Self {
        Self { registry, kv, clock, interval: Duration::from_secs(10), stale_after: T_HEARTBEAT_STALE }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Runs one sweep pass over every pipeline stage, returning the
    /// number of engines newly marked offline.
    pub async fn sweep_once(&self) -> Result<u32, crate::RegistryError> {
        let now_ms = self.clock.epoch_ms();
        let mut newly_offline = 0;
        for stage in Stage::ORDER {
            for engine in self.registry.engines_for_stage(stage).await? {
                if engine.status == EngineStatus::Offline {
                    continue;
                }
                if engine.is_fresh(now_ms, self.stale_after.as_millis() as u64) {
                    continue;
                }
                // Conditional set: only this racing sweep's view of
                // "still stale at the time we act" is trusted, not a
                // stale snapshot — re-reading happens inside heartbeat/
                // register, which always wins if the engine resurrects
                // between our read and this unregister-equivalent write.
                self.registry.unregister(&engine.engine_id).await?;
                let event = SchedulerEvent::EngineOffline { engine_id: engine.engine_id.clone() };
                let payload = serde_json::to_value(&event).unwrap_or_default();
                self.kv.publish("engine.offline", payload).await.map_err(crate::RegistryError::Storage)?;
                warn!(engine_id = %engine.engine_id, stage = %stage, "engine marked offline by sweeper");
                newly_offline += 1;
            }
        }
        Ok(newly_offline)
    }

    /// Runs the sweep loop until `shutdown` fires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep_once().await {
                        warn!(error = %err, "stale engine sweep failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("stale engine sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
