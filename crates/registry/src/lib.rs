// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
//! tx-registry: C4 Engine Registry.
//!
//! Tracks liveness, capability, and capacity of every batch engine
//! process. State lives entirely in the KV coordinator (C1): it is
//! high-churn and recoverable, never authoritative. Engine *identity*
//! (name, stage, capabilities) is configuration the operator supplies
//! at `register` time; engine *state* (status, last heartbeat) is
//! volatile and reconstructed by restart or by the sweeper.

mod sweeper;

pub use sweeper::StaleEngineSweeper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use tx_storage::KvStore;
use tx_wire::{EngineId, EngineIdentity, EngineState, EngineStatus, Stage, TaskId};

/// Offline threshold: an engine with no fresh heartbeat for longer than
/// this is treated as unavailable for dispatch (spec I4, default 60s).
pub const T_HEARTBEAT_STALE: Duration = Duration::from_secs(60);
/// Default heartbeat emission period for a well-behaved engine.
pub const T_HEARTBEAT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("storage error: {0}")]
    Storage(#[from] tx_storage::KvError),
    #[error("malformed engine record for {0}")]
    Malformed(String),
}

fn engine_set_key(stage: Stage) -> String {
    format!("engines:{stage}")
}

fn engine_hash_key(engine_id: &EngineId) -> String {
    format!("engine:{}", engine_id.as_str())
}

/// Legacy single-key heartbeat fallback, kept only as a migration
/// affordance (spec Open Question: "documented as a migration
/// affordance... never as steady-state behavior").
fn legacy_heartbeat_key(engine_id: &EngineId) -> String {
    format!("heartbeat:{}", engine_id.as_str())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EngineRecord {
    identity: EngineIdentity,
    status: EngineStatus,
    current_task: Option<TaskId>,
    last_heartbeat_ms: u64,
    registered_at_ms: u64,
}

impl EngineRecord {
    fn state(&self) -> EngineState {
        EngineState {
            engine_id: self.identity.engine_id.clone(),
            queue_name: self.identity.queue_name.clone(),
            status: self.status,
            current_task: self.current_task,
            last_heartbeat_ms: self.last_heartbeat_ms,
            registered_at_ms: self.registered_at_ms,
            capacity: None,
        }
    }
}

fn malformed(engine_id: &EngineId) -> RegistryError {
    RegistryError::Malformed(engine_id.as_str().to_string())
}

/// C4 Engine Registry contract (spec §4.2).
#[async_trait]
pub trait EngineRegistry: Send + Sync {
    async fn register(&self, identity: EngineIdentity, now_ms: u64) -> Result<(), RegistryError>;

    async fn heartbeat(
        &self,
        engine_id: &EngineId,
        status: EngineStatus,
        current_task: Option<TaskId>,
        now_ms: u64,
    ) -> Result<(), RegistryError>;

    async fn unregister(&self, engine_id: &EngineId) -> Result<(), RegistryError>;

    async fn engines_for_stage(&self, stage: Stage) -> Result<Vec<EngineState>, RegistryError>;

    /// True iff a fresh heartbeat exists for `engine_id`. Falls back to
    /// the legacy single-key heartbeat during migration, logging a
    /// deprecation warning each time the fallback is hit.
    async fn is_available(&self, engine_id: &EngineId, now_ms: u64) -> Result<bool, RegistryError>;

    /// Looks up a single engine's state, used by the scheduler (C7) to
    /// resolve the FIFO queue a dispatched task payload is written to.
    async fn get_state(&self, engine_id: &EngineId) -> Result<Option<EngineState>, RegistryError>;
}

/// KV-backed [`EngineRegistry`].
#[derive(Clone)]
pub struct KvEngineRegistry<K: KvStore> {
    kv: K,
}

impl<K: KvStore> KvEngineRegistry<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    async fn load(&self, engine_id: &EngineId) -> Result<Option<EngineRecord>, RegistryError> {
        let Some(v) = self.kv.hash_get(&engine_hash_key(engine_id), "record").await? else {
            return Ok(None);
        };
        serde_json::from_value(v).map(Some).map_err(|_| malformed(engine_id))
    }

    async fn store(&self, record: &EngineRecord) -> Result<(), RegistryError> {
        let value = serde_json::to_value(record).map_err(|_| malformed(&record.identity.engine_id))?;
        self.kv.hash_set(&engine_hash_key(&record.identity.engine_id), "record", value).await?;
        Ok(())
    }
}

#[async_trait]
impl<K: KvStore> EngineRegistry for KvEngineRegistry<K> {
    async fn register(&self, identity: EngineIdentity, now_ms: u64) -> Result<(), RegistryError> {
        let stage = identity.stage;
        let engine_id = identity.engine_id.clone();
        let record = EngineRecord {
            identity,
            status: EngineStatus::Idle,
            current_task: None,
            last_heartbeat_ms: now_ms,
            registered_at_ms: now_ms,
        };
        self.store(&record).await?;
        self.kv.set_add(&engine_set_key(stage), engine_id.as_str()).await?;
        Ok(())
    }

    async fn heartbeat(
        &self,
        engine_id: &EngineId,
        status: EngineStatus,
        current_task: Option<TaskId>,
        now_ms: u64,
    ) -> Result<(), RegistryError> {
        match self.load(engine_id).await? {
            Some(mut record) => {
                record.status = status;
                record.current_task = current_task;
                record.last_heartbeat_ms = now_ms;
                let stage = record.identity.stage;
                self.store(&record).await?;
                // Re-adds set membership in case a prior sweep marked
                // this engine offline and removed it: a resurrected
                // engine's heartbeat always wins.
                self.kv.set_add(&engine_set_key(stage), engine_id.as_str()).await?;
                Ok(())
            }
            None => {
                // Tolerates restart ordering: a harness may heartbeat
                // before its register() round-trip lands (spec §4.2).
                warn!(engine_id = %engine_id, "heartbeat from unregistered engine, creating placeholder record");
                self.kv
                    .set_with_ttl(
                        &legacy_heartbeat_key(engine_id),
                        serde_json::json!(now_ms),
                        T_HEARTBEAT_STALE,
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn unregister(&self, engine_id: &EngineId) -> Result<(), RegistryError> {
        if let Some(mut record) = self.load(engine_id).await? {
            record.status = EngineStatus::Offline;
            let stage = record.identity.stage;
            self.store(&record).await?;
            self.kv.set_remove(&engine_set_key(stage), engine_id.as_str()).await?;
        }
        Ok(())
    }

    async fn engines_for_stage(&self, stage: Stage) -> Result<Vec<EngineState>, RegistryError> {
        let members = self.kv.set_members(&engine_set_key(stage)).await?;
        let mut states = Vec::with_capacity(members.len());
        for member in members {
            let engine_id = EngineId::new(member);
            if let Some(record) = self.load(&engine_id).await? {
                states.push(record.state());
            }
        }
        Ok(states)
    }

    async fn is_available(&self, engine_id: &EngineId, now_ms: u64) -> Result<bool, RegistryError> {
        if let Some(record) = self.load(engine_id).await? {
            let age_ms = now_ms.saturating_sub(record.last_heartbeat_ms);
            return Ok(record.status != EngineStatus::Offline && age_ms <= T_HEARTBEAT_STALE.as_millis() as u64);
        }

        // Migration shim: consult the legacy single-key heartbeat before
        // declaring the engine unknown.
        if let Some(v) = self.kv.get(&legacy_heartbeat_key(engine_id)).await? {
            warn!(engine_id = %engine_id, "is_available fell back to legacy heartbeat key");
            let last_heartbeat_ms: u64 = serde_json::from_value(v).map_err(|_| malformed(engine_id))?;
            let age_ms = now_ms.saturating_sub(last_heartbeat_ms);
            return Ok(age_ms <= T_HEARTBEAT_STALE.as_millis() as u64);
        }

        Ok(false)
    }

    async fn get_state(&self, engine_id: &EngineId) -> Result<Option<EngineState>, RegistryError> {
        Ok(self.load(engine_id).await?.map(|record| record.state()))
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
