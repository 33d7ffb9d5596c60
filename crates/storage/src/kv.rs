// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C1 Key-Value Coordinator contract (spec §6).
//!
//! Durable-ish, low-latency store offering hash get/set, set add/members,
//! FIFO queues with a visibility lease, atomic counters, pub/sub
//! channels, and key TTL. The orchestrator, registry, harness, and
//! realtime router crates depend only on this trait; [`memory`]
//! ships the in-memory reference adapter used by every crate's tests.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("deadline exceeded after {0:?}")]
    Timeout(Duration),
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("lease {lease_id} for {key} has already expired or was never held")]
    LeaseExpired { key: String, lease_id: String },
    #[error("transport error: {0}")]
    Transport(String),
}

/// A FIFO item popped under a visibility lease. The lease hides the item
/// from other consumers until [`KvStore::ack`] is called or `lease_for`
/// elapses, at which point it becomes poppable again (spec §4.4 step 2,
/// §5 "Queue leases").
#[derive(Debug, Clone)]
pub struct LeasedItem {
    pub value: Value,
    pub lease_id: String,
}

/// Contract for the KV coordinator (spec §6 "C1 (KV)").
///
/// All operations are suspension points (spec §5): implementations are
/// expected to enforce the caller's deadline (default 5s per spec §5)
/// themselves or via a wrapping timeout combinator; this trait does not
/// impose one so that in-memory tests aren't forced to race a clock.
#[async_trait]
pub trait KvStore: Send + Sync {
    // --- Hash ---
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Value>, KvError>;
    async fn hash_set(&self, key: &str, field: &str, value: Value) -> Result<(), KvError>;
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, Value)>, KvError>;
    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), KvError>;

    // --- Set ---
    async fn set_add(&self, key: &str, member: &str) -> Result<(), KvError>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), KvError>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>, KvError>;

    // --- FIFO queue with visibility lease ---
    async fn queue_push(&self, queue: &str, value: Value) -> Result<(), KvError>;
    /// Pop the head of `queue` under a visibility lease of `lease_for`.
    /// Returns `None` if the queue is empty. The item stays invisible to
    /// other poppers until [`ack`](Self::ack) or the lease expires, at
    /// which point a background reaper (driven by the caller, not this
    /// trait) should call [`requeue_expired`](Self::requeue_expired).
    async fn queue_pop(&self, queue: &str, lease_for: Duration) -> Result<Option<LeasedItem>, KvError>;
    async fn ack(&self, queue: &str, lease_id: &str) -> Result<(), KvError>;
    /// Move any items whose lease has expired back onto the queue head.
    /// Returns how many items were requeued.
    async fn requeue_expired(&self, queue: &str) -> Result<u32, KvError>;
    async fn queue_len(&self, queue: &str) -> Result<u64, KvError>;

    // --- Atomic counter ---
    async fn incr(&self, key: &str, by: i64) -> Result<i64, KvError>;

    // --- Pub/sub ---
    async fn publish(&self, channel: &str, payload: Value) -> Result<(), KvError>;
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Value>;

    // --- TTL ---
    async fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<(), KvError>;
    async fn get(&self, key: &str) -> Result<Option<Value>, KvError>;
}

pub mod memory;
pub use memory::InMemoryKv;

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
