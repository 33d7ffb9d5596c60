// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Throttled progress reporting handed to an [`crate::EngineProcess`]
//! implementation (spec §4.4 step 4: "at most once per second").

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tx_storage::KvStore;
use tx_wire::{JobId, ProgressBusEvent, ProgressEvent, ProgressRecord, Stage, TaskId};

const MIN_INTERVAL: Duration = Duration::from_secs(1);
const PROGRESS_TTL: Duration = Duration::from_secs(60);

/// Cheap to clone: shared throttle state lives behind an `Arc`.
#[derive(Clone)]
pub struct ProgressReporter {
    kv: Arc<dyn ReportSink>,
    task_id: TaskId,
    job_id: JobId,
    stage: Stage,
    correlation: txctl_core::Correlation,
    last_sent: Arc<Mutex<Option<Instant>>>,
}

/// Object-safe narrowing of [`KvStore`] so `ProgressReporter` does not
/// need to be generic over the store type.
#[async_trait::async_trait]
trait ReportSink: Send + Sync {
    async fn set_with_ttl(&self, key: &str, value: serde_json::Value, ttl: Duration);
    async fn publish(&self, channel: &str, value: serde_json::Value);
}

#[async_trait::async_trait]
impl<K: KvStore> ReportSink for K {
    async fn set_with_ttl(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        let _ = KvStore::set_with_ttl(self, key, value, ttl).await;
    }

    async fn publish(&self, channel: &str, value: serde_json::Value) {
        let _ = KvStore::publish(self, channel, value).await;
    }
}

impl ProgressReporter {
    pub fn new<K: KvStore + 'static>(kv: K, task_id: TaskId, correlation: txctl_core::Correlation) -> Self {
        Self::with_job_and_stage(kv, task_id, JobId::new(), Stage::Prepare, correlation)
    }

    pub fn with_job_and_stage<K: KvStore + 'static>(
        kv: K,
        task_id: TaskId,
        job_id: JobId,
        stage: Stage,
        correlation: txctl_core::Correlation,
    ) -> Self {
        Self { kv: Arc::new(kv), task_id, job_id, stage, correlation, last_sent: Arc::new(Mutex::new(None)) }
    }

    /// Reports progress, silently dropping the update if one was already
    /// sent within the last second. The final call a task makes before
    /// completing should bypass this via [`Self::report_final`].
    pub async fn report(&self, percent: u8, message: Option<String>) {
        let now = Instant::now();
        {
            let mut last_sent = self.last_sent.lock();
            if let Some(last) = *last_sent {
                if now.duration_since(last) < MIN_INTERVAL {
                    return;
                }
            }
            *last_sent = Some(now);
        }
        self.send(percent, message).await;
    }

    /// Sends unconditionally, bypassing the throttle. Used for the
    /// progress update that immediately precedes task completion so the
    /// final percentage is never silently dropped.
    pub async fn report_final(&self, percent: u8, message: Option<String>) {
        *self.last_sent.lock() = Some(Instant::now());
        self.send(percent, message).await;
    }

    async fn send(&self, percent: u8, message: Option<String>) {
        let updated_at_ms = txctl_core::Clock::epoch_ms(&txctl_core::SystemClock);
        let record = ProgressRecord::new(self.task_id, percent, message.clone(), updated_at_ms);
        if let Ok(value) = serde_json::to_value(&record) {
            self.kv.set_with_ttl(&format!("progress:{}", self.task_id.as_str()), value, PROGRESS_TTL).await;
        }

        let event = ProgressBusEvent::TaskProgress(ProgressEvent {
            task_id: self.task_id,
            job_id: self.job_id,
            stage: self.stage,
            percent: percent.min(100),
            message,
            updated_at_ms,
        });
        if let Ok(value) = serde_json::to_value(&event) {
            self.kv.publish(&tx_wire::progress_channel(self.job_id), value).await;
        }
    }

    pub fn correlation(&self) -> &txctl_core::Correlation {
        &self.correlation
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
