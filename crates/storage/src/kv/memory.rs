// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory reference adapter for [`super::KvStore`]. Used by every
//! crate's test suite; not a production backend (spec §1 treats Redis-
//! or similar as an external collaborator).

use super::{KvError, KvStore, LeasedItem};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

struct QueueEntry {
    id: String,
    value: Value,
}

struct LeasedEntry {
    queue: String,
    entry: QueueEntry,
    expires_at: Instant,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueueEntry>,
    leased: HashMap<String, LeasedEntry>,
}

struct TtlEntry {
    value: Value,
    expires_at: Instant,
}

/// In-memory [`KvStore`]. Cheap to clone: internal state lives behind
/// `Arc`s, so handing a clone to each task/test fixture shares the
/// same underlying store.
#[derive(Clone, Default)]
pub struct InMemoryKv {
    hashes: Arc<DashMap<String, HashMap<String, Value>>>,
    sets: Arc<DashMap<String, std::collections::HashSet<String>>>,
    queues: Arc<DashMap<String, Mutex<QueueState>>>,
    counters: Arc<DashMap<String, i64>>,
    channels: Arc<DashMap<String, broadcast::Sender<Value>>>,
    ttl_keys: Arc<DashMap<String, TtlEntry>>,
    lease_seq: Arc<Mutex<u64>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_lease_id(&self) -> String {
        let mut seq = self.lease_seq.lock();
        *seq += 1;
        format!("lease-{}", *seq)
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Value>, KvError> {
        Ok(self.hashes.get(key).and_then(|h| h.get(field).cloned()))
    }

    async fn hash_set(&self, key: &str, field: &str, value: Value) -> Result<(), KvError> {
        self.hashes.entry(key.to_string()).or_default().insert(field.to_string(), value);
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, Value)>, KvError> {
        Ok(self
            .hashes
            .get(key)
            .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), KvError> {
        if let Some(mut h) = self.hashes.get_mut(key) {
            h.remove(field);
        }
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), KvError> {
        self.sets.entry(key.to_string()).or_default().insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), KvError> {
        if let Some(mut s) = self.sets.get_mut(key) {
            s.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, KvError> {
        Ok(self.sets.get(key).map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }

    async fn queue_push(&self, queue: &str, value: Value) -> Result<(), KvError> {
        let state = self.queues.entry(queue.to_string()).or_default();
        let mut state = state.lock();
        let id = format!("item-{}", state.pending.len() + state.leased.len() + 1);
        state.pending.push_back(QueueEntry { id, value });
        Ok(())
    }

    async fn queue_pop(&self, queue: &str, lease_for: Duration) -> Result<Option<LeasedItem>, KvError> {
        let state = self.queues.entry(queue.to_string()).or_default();
        let mut state = state.lock();
        let Some(entry) = state.pending.pop_front() else {
            return Ok(None);
        };
        let lease_id = self.next_lease_id();
        let value = entry.value.clone();
        state.leased.insert(
            lease_id.clone(),
            LeasedEntry { queue: queue.to_string(), entry, expires_at: Instant::now() + lease_for },
        );
        Ok(Some(LeasedItem { value, lease_id }))
    }

    async fn ack(&self, queue: &str, lease_id: &str) -> Result<(), KvError> {
        let Some(state) = self.queues.get(queue) else {
            return Err(KvError::LeaseExpired { key: queue.to_string(), lease_id: lease_id.to_string() });
        };
        let mut state = state.lock();
        state
            .leased
            .remove(lease_id)
            .map(|_| ())
            .ok_or_else(|| KvError::LeaseExpired { key: queue.to_string(), lease_id: lease_id.to_string() })
    }

    async fn requeue_expired(&self, queue: &str) -> Result<u32, KvError> {
        let Some(state) = self.queues.get(queue) else { return Ok(0) };
        let mut state = state.lock();
        let now = Instant::now();
        let expired_ids: Vec<String> = state
            .leased
            .iter()
            .filter(|(_, l)| l.expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        let count = expired_ids.len() as u32;
        for id in expired_ids {
            if let Some(leased) = state.leased.remove(&id) {
                debug_assert_eq!(leased.queue, queue);
                state.pending.push_front(leased.entry);
            }
        }
        Ok(count)
    }

    async fn queue_len(&self, queue: &str) -> Result<u64, KvError> {
        Ok(self.queues.get(queue).map(|s| s.lock().pending.len() as u64).unwrap_or(0))
    }

    async fn incr(&self, key: &str, by: i64) -> Result<i64, KvError> {
        let mut counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter += by;
        Ok(*counter)
    }

    async fn publish(&self, channel: &str, payload: Value) -> Result<(), KvError> {
        let sender = self.channels.entry(channel.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel(256);
            tx
        });
        // No subscribers is not an error: pub/sub has no durability guarantee.
        let _ = sender.send(payload);
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Value> {
        let sender = self.channels.entry(channel.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel(256);
            tx
        });
        sender.subscribe()
    }

    async fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<(), KvError> {
        self.ttl_keys.insert(key.to_string(), TtlEntry { value, expires_at: Instant::now() + ttl });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        let Some(entry) = self.ttl_keys.get(key) else { return Ok(None) };
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.ttl_keys.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }
}
