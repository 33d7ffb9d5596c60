// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime Worker State registry (spec §3 "Realtime Worker State",
//! §4.5). Mirrors `tx-registry`'s `EngineRegistry` shape, but a realtime
//! worker additionally carries capacity/`active_sessions`, which must be
//! mutated atomically (I5) rather than as part of the free-form record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use tx_storage::KvStore;
use tx_wire::{EngineStatus, RealtimeWorkerState, WorkerId};

#[derive(Debug, Error)]
pub enum WorkerRegistryError {
    #[error("storage error: {0}")]
    Storage(#[from] tx_storage::KvError),
    #[error("malformed worker record for {0}")]
    Malformed(String),
    #[error("worker {0} is not registered")]
    NotFound(WorkerId),
}

const WORKER_SET_KEY: &str = "realtime:workers";

fn worker_hash_key(worker_id: &WorkerId) -> String {
    format!("realtime:worker:{worker_id}")
}

fn active_sessions_key(worker_id: &WorkerId) -> String {
    format!("realtime:active_sessions:{worker_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkerRecord {
    worker_id: WorkerId,
    endpoint: String,
    status: EngineStatus,
    capacity: u32,
    loaded_models: Vec<String>,
    supported_languages: Vec<String>,
    last_heartbeat_ms: u64,
    registered_at_ms: u64,
}

/// Registry contract for realtime workers (spec §3/§4.5). Identity
/// (endpoint, capacity, declared models/languages) is supplied at
/// `register` time; `active_sessions` is tracked as a separate atomic
/// counter so [`SessionRouter`](crate::SessionRouter) never races itself
/// (I5).
#[async_trait]
pub trait RealtimeWorkerRegistry: Send + Sync {
    async fn register(
        &self,
        worker_id: WorkerId,
        endpoint: String,
        capacity: u32,
        loaded_models: Vec<String>,
        supported_languages: Vec<String>,
        now_ms: u64,
    ) -> Result<(), WorkerRegistryError>;

    async fn heartbeat(
        &self,
        worker_id: &WorkerId,
        status: EngineStatus,
        now_ms: u64,
    ) -> Result<(), WorkerRegistryError>;

    async fn unregister(&self, worker_id: &WorkerId) -> Result<(), WorkerRegistryError>;

    async fn mark_offline(&self, worker_id: &WorkerId) -> Result<(), WorkerRegistryError>;

    /// Every registered worker's current state, `active_sessions`
    /// overlaid from the live counter rather than the stored record.
    async fn list_workers(&self) -> Result<Vec<RealtimeWorkerState>, WorkerRegistryError>;

    async fn get_worker(&self, worker_id: &WorkerId) -> Result<Option<RealtimeWorkerState>, WorkerRegistryError>;

    /// Atomically increments `active_sessions` and returns `true` if the
    /// resulting count is within `capacity`. If it would overshoot, the
    /// increment is compensated with a decrement and `false` is
    /// returned — the chosen-worker race is resolved by whichever
    /// caller's `incr` lands first (spec §5 "atomic counter operations").
    async fn try_acquire(&self, worker_id: &WorkerId) -> Result<bool, WorkerRegistryError>;

    /// Atomically decrements `active_sessions`, floored at zero.
    async fn release(&self, worker_id: &WorkerId) -> Result<(), WorkerRegistryError>;
}

/// KV-backed [`RealtimeWorkerRegistry`].
pub struct KvWorkerRegistry<K: KvStore> {
    kv: K,
}

impl<K: KvStore> KvWorkerRegistry<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    async fn load(&self, worker_id: &WorkerId) -> Result<Option<WorkerRecord>, WorkerRegistryError> {
        let Some(v) = self.kv.hash_get(&worker_hash_key(worker_id), "record").await? else {
            return Ok(None);
        };
        serde_json::from_value(v).map(Some).map_err(|_| malformed(worker_id))
    }

    async fn store(&self, record: &WorkerRecord) -> Result<(), WorkerRegistryError> {
        let value = serde_json::to_value(record).map_err(|_| malformed(&record.worker_id))?;
        self.kv.hash_set(&worker_hash_key(&record.worker_id), "record", value).await?;
        Ok(())
    }

    /// Reads the current counter without mutating it: `incr` by zero is
    /// still an atomic read of the live value (the counter keyspace has
    /// no separate non-mutating getter in the KV contract).
    async fn active_sessions(&self, worker_id: &WorkerId) -> Result<u32, WorkerRegistryError> {
        let key = active_sessions_key(worker_id);
        Ok(self.kv.incr(&key, 0).await?.max(0) as u32)
    }

    fn state_of(record: &WorkerRecord, active_sessions: u32) -> RealtimeWorkerState {
        RealtimeWorkerState {
            worker_id: record.worker_id,
            endpoint: record.endpoint.clone(),
            status: record.status,
            capacity: record.capacity,
            active_sessions,
            loaded_models: record.loaded_models.clone(),
            supported_languages: record.supported_languages.clone(),
            last_heartbeat_ms: record.last_heartbeat_ms,
            registered_at_ms: record.registered_at_ms,
        }
    }
}

fn malformed(worker_id: &WorkerId) -> WorkerRegistryError {
    WorkerRegistryError::Malformed(worker_id.to_string())
}

#[async_trait]
impl<K: KvStore> RealtimeWorkerRegistry for KvWorkerRegistry<K> {
    async fn register(
        &self,
        worker_id: WorkerId,
        endpoint: String,
        capacity: u32,
        loaded_models: Vec<String>,
        supported_languages: Vec<String>,
        now_ms: u64,
    ) -> Result<(), WorkerRegistryError> {
        let record = WorkerRecord {
            worker_id,
            endpoint,
            status: EngineStatus::Idle,
            capacity,
            loaded_models,
            supported_languages,
            last_heartbeat_ms: now_ms,
            registered_at_ms: now_ms,
        };
        self.store(&record).await?;
        // Registration never resets active_sessions: a worker that
        // re-registers mid-flight (restart ordering) keeps whatever the
        // counter already reflects instead of losing track of sessions
        // the router believes are still bound to it. The counter starts
        // implicitly at zero the first time it's incremented.
        self.kv.set_add(WORKER_SET_KEY, worker_id.as_str()).await?;
        Ok(())
    }

    async fn heartbeat(
        &self,
        worker_id: &WorkerId,
        status: EngineStatus,
        now_ms: u64,
    ) -> Result<(), WorkerRegistryError> {
        match self.load(worker_id).await? {
            Some(mut record) => {
                record.status = status;
                record.last_heartbeat_ms = now_ms;
                self.store(&record).await?;
                self.kv.set_add(WORKER_SET_KEY, worker_id.as_str()).await?;
                Ok(())
            }
            None => {
                warn!(worker_id = %worker_id, "heartbeat from unregistered realtime worker");
                Err(WorkerRegistryError::NotFound(*worker_id))
            }
        }
    }

    async fn unregister(&self, worker_id: &WorkerId) -> Result<(), WorkerRegistryError> {
        self.mark_offline(worker_id).await?;
        self.kv.set_remove(WORKER_SET_KEY, worker_id.as_str()).await?;
        Ok(())
    }

    async fn mark_offline(&self, worker_id: &WorkerId) -> Result<(), WorkerRegistryError> {
        if let Some(mut record) = self.load(worker_id).await? {
            record.status = EngineStatus::Offline;
            self.store(&record).await?;
        }
        Ok(())
    }

    async fn list_workers(&self) -> Result<Vec<RealtimeWorkerState>, WorkerRegistryError> {
        let members = self.kv.set_members(WORKER_SET_KEY).await?;
        let mut states = Vec::with_capacity(members.len());
        for member in members {
            let worker_id = WorkerId::from_string(member);
            if let Some(record) = self.load(&worker_id).await? {
                let active = self.active_sessions(&worker_id).await?;
                states.push(Self::state_of(&record, active));
            }
        }
        Ok(states)
    }

    async fn get_worker(&self, worker_id: &WorkerId) -> Result<Option<RealtimeWorkerState>, WorkerRegistryError> {
        let Some(record) = self.load(worker_id).await? else { return Ok(None) };
        let active = self.active_sessions(worker_id).await?;
        Ok(Some(Self::state_of(&record, active)))
    }

    async fn try_acquire(&self, worker_id: &WorkerId) -> Result<bool, WorkerRegistryError> {
        let Some(record) = self.load(worker_id).await? else {
            return Err(WorkerRegistryError::NotFound(*worker_id));
        };
        let key = active_sessions_key(worker_id);
        let after = self.kv.incr(&key, 1).await?;
        if after as u32 <= record.capacity {
            Ok(true)
        } else {
            self.kv.incr(&key, -1).await?;
            Ok(false)
        }
    }

    async fn release(&self, worker_id: &WorkerId) -> Result<(), WorkerRegistryError> {
        let key = active_sessions_key(worker_id);
        let after = self.kv.incr(&key, -1).await?;
        if after < 0 {
            // Defensive floor: a double-release should never happen if
            // callers pair acquire/release correctly, but never let the
            // counter go negative and desync from reality.
            self.kv.incr(&key, 1).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "worker_registry_tests.rs"]
mod tests;
