// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
//! tx-harness: C5 Engine Worker Harness.
//!
//! A library linked into every engine process. It owns registration,
//! heartbeating, the lease-based queue pop loop, input/output transfer
//! against the object store, throttled progress reporting, and graceful
//! draining — so an engine author only implements [`EngineProcess`].

mod progress;
mod signal;

pub use progress::ProgressReporter;
pub use signal::CancellationSignal;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tx_registry::EngineRegistry;
use tx_storage::{KvStore, ObjectStore};
use tx_wire::{
    CompletionErrorPayload, EngineIdentity, EngineStatus, JobId, SchedulerEvent, Stage, TaskCompletionEvent,
    TaskId, TaskOutcome, TaskPayload,
};

/// Visibility lease held on a popped queue entry (spec §4.4 step 2,
/// default 5 minutes).
pub const T_LEASE: Duration = Duration::from_secs(300);

/// Narrow interface an engine implementation supplies.
pub struct TaskInput {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub audio_uri: String,
    pub audio_bytes: Vec<u8>,
    pub prior_outputs_by_stage: HashMap<Stage, Vec<u8>>,
    pub config: serde_json::Value,
    pub progress: ProgressReporter,
    pub cancellation: CancellationSignal,
    pub correlation: txctl_core::Correlation,
}

pub struct TaskOutput {
    /// The task's single output blob, uploaded by the harness under a
    /// deterministic `task_id`-derived key so duplicate execution after
    /// a lease expiry writes the same bytes to the same place (spec
    /// §4.4 step 5).
    pub artifact: Vec<u8>,
    pub content_type: String,
    pub metrics: serde_json::Value,
}

/// Implemented once per engine. The harness drives everything around it:
/// registration, heartbeats, queue leasing, retries at the scheduler
/// layer, and artifact transfer.
#[async_trait]
pub trait EngineProcess: Send + Sync {
    async fn process(&self, input: TaskInput) -> Result<TaskOutput, txctl_core::StageError>;
}

fn artifact_key(job_id: &JobId, task_id: &TaskId) -> String {
    format!("artifacts/{}/{}", job_id.as_str(), task_id.as_str())
}

/// Drives an [`EngineProcess`] through its full lifecycle against the
/// KV coordinator, object store, and engine registry (spec §4.4).
pub struct Harness<E, K, R, O> {
    engine: Arc<E>,
    kv: K,
    registry: Arc<R>,
    store: O,
    identity: EngineIdentity,
    clock: txctl_core::SystemClock,
    heartbeat_interval: Duration,
    lease: Duration,
}

impl<E, K, R, O> Harness<E, K, R, O>
where
    E: EngineProcess + 'static,
    K: KvStore + Clone + 'static,
    R: EngineRegistry + 'static,
    O: ObjectStore + Clone + 'static,
{
    pub fn new(engine: E, kv: K, registry: R, store: O, identity: EngineIdentity) -> Self {
        Self {
            engine: Arc::new(engine),
            kv,
            registry: Arc::new(registry),
            store,
            identity,
            clock: txctl_core::SystemClock,
            heartbeat_interval: Duration::from_secs(10),
            lease: T_LEASE,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Runs until `shutdown` fires, then drains (finishes the in-flight
    /// task, stops popping, unregisters).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), txctl_core::StageError> {
        use txctl_core::Clock;

        self.registry
            .register(self.identity.clone(), self.clock.epoch_ms())
            .await
            .map_err(registry_error)?;
        info!(engine_id = %self.identity.engine_id, stage = %self.identity.stage, "engine registered");

        let heartbeat_handle = self.spawn_heartbeat_loop();

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                popped = self.kv.queue_pop(&self.identity.queue_name, self.lease) => {
                    match popped {
                        Ok(Some(leased)) => self.handle_one(leased).await,
                        Ok(None) => tokio::time::sleep(Duration::from_millis(200)).await,
                        Err(err) => {
                            warn!(error = %err, "queue pop failed");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }

        info!(engine_id = %self.identity.engine_id, "draining");
        heartbeat_handle.abort();
        self.registry.unregister(&self.identity.engine_id).await.map_err(registry_error)?;
        Ok(())
    }

    fn spawn_heartbeat_loop(&self) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let engine_id = self.identity.engine_id.clone();
        let interval = self.heartbeat_interval;
        let clock = self.clock.clone();
        tokio::spawn(async move {
            use txctl_core::Clock;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = registry.heartbeat(&engine_id, EngineStatus::Idle, None, clock.epoch_ms()).await
                {
                    warn!(error = %err, "heartbeat failed");
                }
            }
        })
    }

    /// Processes one leased queue entry end to end: fetch input, run
    /// the engine, upload output, publish the completion event, and
    /// ack (or, on a fetch/process error, leave the lease to expire so
    /// another engine retries).
    async fn handle_one(&self, leased: tx_storage::LeasedItem) {
        let Ok(payload) = serde_json::from_value::<TaskPayload>(leased.value.clone()) else {
            error!("malformed queue entry, acking to avoid poison-pilling the queue");
            let _ = self.kv.ack(&self.identity.queue_name, &leased.lease_id).await;
            return;
        };

        let started = std::time::Instant::now();
        let cancellation = CancellationSignal::new();
        let cancel_watcher = self.spawn_cancel_watcher(payload.task_id, cancellation.clone());

        let input = match self.fetch_input(&payload, cancellation).await {
            Ok(input) => input,
            Err(err) => {
                cancel_watcher.abort();
                self.publish_failure(&payload, err, started.elapsed()).await;
                // Deterministic failure, already reported to the scheduler's
                // own retry path (spec §4.4 step 5): ack now rather than
                // leaving the lease to expire, which would redeliver this
                // same entry to another engine on top of the scheduler's
                // independent redispatch once the task cycles back to ready.
                let _ = self.kv.ack(&self.identity.queue_name, &leased.lease_id).await;
                return;
            }
        };

        let outcome = self.engine.process(input).await;
        cancel_watcher.abort();
        match outcome {
            Ok(output) => match self.upload_output(&payload, output.artifact, &output.content_type).await {
                Ok(output_uri) => {
                    self.publish_success(&payload, output_uri, output.metrics, started.elapsed()).await;
                    let _ = self.kv.ack(&self.identity.queue_name, &leased.lease_id).await;
                }
                Err(err) => self.publish_failure(&payload, err, started.elapsed()).await,
            },
            Err(err) => {
                self.publish_failure(&payload, err, started.elapsed()).await;
                let _ = self.kv.ack(&self.identity.queue_name, &leased.lease_id).await;
            }
        }
    }

    /// Listens for the scheduler's `cancel:{task_id}` pub/sub message
    /// (published on cancellation request, spec §4.3) and flips
    /// `signal` the moment one arrives. Aborted once the task finishes
    /// one way or another so it doesn't outlive its task.
    fn spawn_cancel_watcher(&self, task_id: TaskId, signal: CancellationSignal) -> tokio::task::JoinHandle<()> {
        let mut rx = self.kv.subscribe(&format!("cancel:{task_id}"));
        tokio::spawn(async move {
            if rx.recv().await.is_ok() {
                signal.cancel();
            }
        })
    }

    async fn fetch_input(
        &self,
        payload: &TaskPayload,
        cancellation: CancellationSignal,
    ) -> Result<TaskInput, txctl_core::StageError> {
        let audio_bytes = self.store.get_object(&payload.audio_uri).await.map_err(|e| {
            txctl_core::StageError::new(txctl_core::ErrorKind::InputFetchError, "harness", e.to_string())
                .with_correlation(payload.correlation.clone())
        })?;

        let mut prior_outputs_by_stage = HashMap::new();
        for (stage, key) in &payload.prior_outputs {
            let bytes = self.store.get_object(key).await.map_err(|e| {
                txctl_core::StageError::new(txctl_core::ErrorKind::InputFetchError, "harness", e.to_string())
                    .with_correlation(payload.correlation.clone())
            })?;
            prior_outputs_by_stage.insert(*stage, bytes);
        }

        Ok(TaskInput {
            task_id: payload.task_id,
            job_id: payload.job_id,
            audio_uri: payload.audio_uri.clone(),
            audio_bytes,
            prior_outputs_by_stage,
            config: payload.config.clone(),
            progress: ProgressReporter::with_job_and_stage(
                self.kv.clone(),
                payload.task_id,
                payload.job_id,
                payload.stage,
                payload.correlation.clone(),
            ),
            cancellation,
            correlation: payload.correlation.clone(),
        })
    }

    async fn upload_output(
        &self,
        payload: &TaskPayload,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, txctl_core::StageError> {
        let key = artifact_key(&payload.job_id, &payload.task_id);
        self.store.put_object(&key, content_type, bytes).await.map_err(|e| {
            txctl_core::StageError::new(txctl_core::ErrorKind::OutputUploadError, "harness", e.to_string())
                .with_correlation(payload.correlation.clone())
        })?;
        Ok(key)
    }

    async fn publish_success(
        &self,
        payload: &TaskPayload,
        output_uri: String,
        metrics: serde_json::Value,
        elapsed: Duration,
    ) {
        let event = SchedulerEvent::TaskCompleted(TaskCompletionEvent {
            task_id: payload.task_id,
            job_id: payload.job_id,
            status: TaskOutcome::Success,
            output_uri: Some(output_uri),
            metrics: Some(metrics),
            error: None,
            duration_ms: elapsed.as_millis() as u64,
        });
        if let Ok(value) = serde_json::to_value(&event) {
            let _ = self.kv.publish("task.completed", value).await;
        }
    }

    async fn publish_failure(&self, payload: &TaskPayload, err: txctl_core::StageError, elapsed: Duration) {
        let event = SchedulerEvent::TaskCompleted(TaskCompletionEvent {
            task_id: payload.task_id,
            job_id: payload.job_id,
            status: TaskOutcome::Failure,
            output_uri: None,
            metrics: None,
            error: Some(CompletionErrorPayload {
                kind: err.kind,
                message: err.message.clone(),
                retryable: err.is_retryable(),
            }),
            duration_ms: elapsed.as_millis() as u64,
        });
        if let Ok(value) = serde_json::to_value(&event) {
            let _ = self.kv.publish("task.completed", value).await;
        }
    }
}

fn registry_error(err: tx_registry::RegistryError) -> txctl_core::StageError {
    txctl_core::StageError::new(txctl_core::ErrorKind::EngineUnavailable, "harness", err.to_string())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
