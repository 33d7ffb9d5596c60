// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C7 Orchestrator Scheduler (spec §4.3).
//!
//! A single-writer reducer over `SchedulerEvent`s. State transitions
//! land on the Task/Job rows in C2 (DS); dispatch writes to an engine's
//! FIFO queue in C1; a parallel "pending dispatch" set in C1 tracks
//! tasks that are `ready` but have no live engine yet, so the periodic
//! sweep half of [`Scheduler::run`] can retry them without rescanning
//! every job.

use crate::progress_channel;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use tx_registry::EngineRegistry;
use tx_storage::{DurableStore, KvStore};
use tx_wire::{
    AuditAction, AuditEntry, AuditId, AuditSubjectKind, CompletionErrorPayload, Job, JobId, JobStatus,
    ProgressBusEvent, SchedulerEvent, Stage, Task, TaskCompletionEvent, TaskId, TaskOutcome, TaskPayload,
    TaskStatus,
};

/// Wait before re-checking engine availability for a parked task
/// (spec §6 `T_dispatch_retry`, default 2s).
pub const T_DISPATCH_RETRY: Duration = Duration::from_secs(2);
/// Max time a task may wait for a live engine before failing with
/// `EngineUnavailable` (spec §6 `T_dispatch_deadline`, default 10 min).
pub const T_DISPATCH_DEADLINE: Duration = Duration::from_secs(600);
/// How long this replica's per-shard lease is valid before it must
/// renew (spec §4.3 "acquired via a key in C1 with TTL renewal").
const SHARD_LEASE_TTL: Duration = Duration::from_secs(30);

const DISPATCH_PENDING_SET: &str = "dispatch:pending";
const DISPATCH_READY_SINCE: &str = "dispatch:ready_since";
const DISPATCH_RETRY_AT: &str = "dispatch:retry_at";

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("durable store error: {0}")]
    Store(#[from] tx_storage::DsError),
    #[error("kv error: {0}")]
    Kv(#[from] tx_storage::KvError),
    #[error("registry error: {0}")]
    Registry(#[from] tx_registry::RegistryError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("task {0} is not in a retryable (terminally failed) state")]
    TaskNotRetryable(TaskId),
}

/// Exponential retry backoff for a failed-but-retryable task: 1s, 2s,
/// 4s, capped (spec §4.3 "Completion event" step 4). `attempts` is the
/// count after this failure's increment.
fn backoff_ms(attempts: u32) -> u64 {
    let exp = attempts.saturating_sub(1).min(2);
    1000u64 * (1u64 << exp)
}

fn shard_for(job_id: &JobId, shard_count: u32) -> u32 {
    if shard_count <= 1 {
        return 0;
    }
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    job_id.as_str().hash(&mut hasher);
    (hasher.finish() % shard_count as u64) as u32
}

/// Single-writer reducer driving Task/Job state for the jobs this
/// replica's shard owns (spec §4.3, §5 "Ordering guarantees").
pub struct Scheduler<D, K, R, C> {
    store: D,
    kv: K,
    registry: R,
    clock: C,
    dispatch_retry: Duration,
    dispatch_deadline: Duration,
    shard_count: u32,
    owner_id: String,
}

impl<D, K, R, C> Scheduler<D, K, R, C>
where
    D: DurableStore,
    K: KvStore,
    R: EngineRegistry,
    C: txctl_core::Clock,
{
    pub fn new(store: D, kv: K, registry: R, clock: C, owner_id: impl Into<String>) -> Self {
        Self {
            store,
            kv,
            registry,
            clock,
            dispatch_retry: T_DISPATCH_RETRY,
            dispatch_deadline: T_DISPATCH_DEADLINE,
            shard_count: 1,
            owner_id: owner_id.into(),
        }
    }

    pub fn with_dispatch_retry(mut self, dispatch_retry: Duration) -> Self {
        self.dispatch_retry = dispatch_retry;
        self
    }

    pub fn with_dispatch_deadline(mut self, dispatch_deadline: Duration) -> Self {
        self.dispatch_deadline = dispatch_deadline;
        self
    }

    /// Runs this replica against `shard_count` total shards; a job is
    /// only acted on by the replica currently holding its shard's lease
    /// (spec §4.3 "exactly one holds a lease per shard (job_id mod N)").
    pub fn with_shard_count(mut self, shard_count: u32) -> Self {
        self.shard_count = shard_count.max(1);
        self
    }

    /// True if this replica currently holds (or just claimed) the lease
    /// for `job_id`'s shard. Reference-adapter note: a real KV backend
    /// should claim this with an atomic `SET key value NX PX ttl`; this
    /// read-then-write is only safe because the in-memory adapter and
    /// its tests are single-process.
    async fn owns_shard(&self, job_id: &JobId) -> Result<bool, SchedulerError> {
        if self.shard_count <= 1 {
            return Ok(true);
        }
        let key = format!("scheduler:shard:{}", shard_for(job_id, self.shard_count));
        match self.kv.get(&key).await? {
            Some(v) if v.as_str() == Some(self.owner_id.as_str()) => {
                self.kv.set_with_ttl(&key, serde_json::json!(self.owner_id), SHARD_LEASE_TTL).await?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                self.kv.set_with_ttl(&key, serde_json::json!(self.owner_id), SHARD_LEASE_TTL).await?;
                Ok(true)
            }
        }
    }

    async fn now_ms(&self) -> u64 {
        use txctl_core::Clock;
        self.clock.epoch_ms()
    }

    // --- Submission / external triggers ---

    /// Persists a freshly built DAG and runs the first dispatch pass.
    /// The (out-of-scope) ingestion API calls this once per accepted
    /// job, after `dag::build_dag` has produced `tasks`.
    pub async fn submit_job(&self, job: Job, tasks: Vec<Task>) -> Result<(), SchedulerError> {
        let job_id = job.id;
        let correlation = job.correlation.clone();
        let now_ms = self.now_ms().await;
        self.store.create_job_with_tasks(job, tasks).await?;
        self.append_audit(AuditAction::JobCreated, AuditSubjectKind::Job, job_id.to_string(), None, correlation, now_ms)
            .await?;
        let event = SchedulerEvent::JobCreated { job_id };
        let _ = self.kv.publish("job.created", serde_json::to_value(&event)?).await;
        self.handle_job_created(job_id, now_ms).await
    }

    /// Requests cancellation of `job_id`. Callers outside this process
    /// (the admin CLI) only need to publish; an in-process caller gets
    /// the cancellation applied synchronously.
    pub async fn request_cancel(&self, job_id: JobId) -> Result<(), SchedulerError> {
        let now_ms = self.now_ms().await;
        let event = SchedulerEvent::JobCancelRequested { job_id };
        let _ = self.kv.publish("job.cancel_requested", serde_json::to_value(&event)?).await;
        self.handle_job_cancel_requested(job_id, now_ms).await
    }

    /// Administrator-triggered retry of a terminally `failed` task
    /// (spec §6 CLI surface `jobs retry-task <job> <task>`). Resets the
    /// retry budget and attempts immediate redispatch. Only valid for a
    /// task currently `failed`; `skipped`/`cancelled`/`completed` tasks
    /// are rejected since retrying them would violate I1's monotonic
    /// terminal-state guarantee.
    pub async fn retry_task(&self, job_id: JobId, task_id: TaskId) -> Result<(), SchedulerError> {
        let now_ms = self.now_ms().await;
        let Some(mut task) = self.store.get_task(&task_id).await? else {
            return Err(SchedulerError::TaskNotFound(task_id));
        };
        if task.job_id != job_id {
            return Err(SchedulerError::TaskNotFound(task_id));
        }
        if task.status != TaskStatus::Failed {
            return Err(SchedulerError::TaskNotRetryable(task_id));
        }
        let Some(mut job) = self.store.get_job(&job_id).await? else {
            return Err(SchedulerError::JobNotFound(job_id));
        };

        task.status = TaskStatus::Ready;
        task.attempts = 0;
        task.error = None;
        self.store.put_task(task.clone()).await?;

        if job.status.is_terminal() {
            job.status = JobStatus::Running;
            job.completed_at_ms = None;
            job.error = None;
            self.store.put_job(job.clone()).await?;
        }

        if !self.try_dispatch(&mut task, &job, now_ms).await? {
            self.park(task.id, now_ms, None).await?;
        }
        Ok(())
    }

    // --- Reducer ---

    pub async fn handle_event(&self, event: SchedulerEvent, now_ms: u64) -> Result<(), SchedulerError> {
        match event {
            SchedulerEvent::JobCreated { job_id } => self.handle_job_created(job_id, now_ms).await,
            SchedulerEvent::TaskCompleted(completion) => self.handle_task_completed(completion, now_ms).await,
            SchedulerEvent::JobCancelRequested { job_id } => self.handle_job_cancel_requested(job_id, now_ms).await,
            SchedulerEvent::EngineOffline { engine_id } => {
                // No Task-row mutation needed: a crashed engine's
                // in-flight task recovers via its queue lease expiring
                // (spec §4.4 step 5) and dispatch already re-checks
                // `is_available` before assigning any task.
                info!(engine_id = %engine_id, "engine offline event observed by scheduler");
                Ok(())
            }
        }
    }

    pub async fn handle_job_created(&self, job_id: JobId, now_ms: u64) -> Result<(), SchedulerError> {
        if !self.owns_shard(&job_id).await? {
            return Ok(());
        }
        if self.store.get_job(&job_id).await?.is_none() {
            return Err(SchedulerError::JobNotFound(job_id));
        }
        self.advance_and_dispatch(&job_id, now_ms).await
    }

    pub async fn handle_job_cancel_requested(&self, job_id: JobId, now_ms: u64) -> Result<(), SchedulerError> {
        if !self.owns_shard(&job_id).await? {
            return Ok(());
        }
        let Some(mut job) = self.store.get_job(&job_id).await? else {
            return Err(SchedulerError::JobNotFound(job_id));
        };
        if job.status.is_terminal() {
            return Ok(());
        }
        job.status = JobStatus::Cancelled;
        job.completed_at_ms = Some(now_ms);
        self.store.put_job(job.clone()).await?;
        self.append_audit(AuditAction::JobCancelled, AuditSubjectKind::Job, job_id.to_string(), None, job.correlation, now_ms)
            .await?;
        self.cancel_non_terminal_tasks(&job_id, now_ms).await
    }

    /// Idempotent by task_id + final status (P4): a completion event
    /// for a task already in a terminal state is dropped silently.
    pub async fn handle_task_completed(&self, event: TaskCompletionEvent, now_ms: u64) -> Result<(), SchedulerError> {
        let Some(mut task) = self.store.get_task(&event.task_id).await? else {
            return Err(SchedulerError::TaskNotFound(event.task_id));
        };
        if !self.owns_shard(&task.job_id).await? {
            return Ok(());
        }
        if task.status.is_terminal() {
            return Ok(());
        }
        self.unpark(task.id).await?;

        match event.status {
            TaskOutcome::Success => {
                task.status = TaskStatus::Completed;
                task.output_artifact_uri = event.output_uri.clone();
                task.completed_at_ms = Some(now_ms);
                task.error = None;
                self.store.put_task(task.clone()).await?;
                self.publish_progress(
                    task.job_id,
                    ProgressBusEvent::TaskCompleted { task_id: task.id, job_id: task.job_id, status: task.status },
                )
                .await;
                self.advance_and_dispatch(&task.job_id, now_ms).await?;
                self.maybe_finalize_job(&task.job_id, now_ms).await
            }
            TaskOutcome::Failure => {
                task.attempts += 1;
                let (kind, message, retryable) = match &event.error {
                    Some(CompletionErrorPayload { kind, message, retryable }) => (*kind, message.clone(), *retryable),
                    None => (
                        txctl_core::ErrorKind::ProcessingError,
                        "engine reported failure without error detail".to_string(),
                        false,
                    ),
                };
                let error = txctl_core::StageError::new(kind, "scheduler", message)
                    .with_correlation(task.correlation.clone())
                    .with_engine_retryable(retryable);
                if retryable && task.attempts < task.max_retries {
                    task.status = TaskStatus::Ready;
                    task.error = Some(error);
                    self.store.put_task(task.clone()).await?;
                    let retry_at = now_ms + backoff_ms(task.attempts);
                    self.park(task.id, now_ms, Some(retry_at)).await?;
                    Ok(())
                } else {
                    self.fail_task_terminal(task, error, now_ms).await
                }
            }
        }
    }

    // --- Dispatch ---

    /// Recomputes which `pending` tasks in `job_id` have every
    /// dependency satisfied (P3), persists the `ready` transition, and
    /// attempts to dispatch each freshly-ready task immediately.
    ///
    /// Also cascades unreachability: a pending task with a *hard*
    /// (`required_for_downstream = true`) dependency that has itself
    /// reached a terminal, non-satisfying state (typically `Skipped`,
    /// e.g. an optional upstream stage that exhausted retries) can never
    /// become `ready` on its own — nothing else re-evaluates it. Such a
    /// task is itself forced terminal here: `Skipped` if optional, or a
    /// job-failing `Failed` if required (spec §3 Task "Terminal: ...or
    /// its dependency chain made it unreachable"; error kind
    /// `DependencySkipped`, spec §7). Looping until a pass produces no
    /// further change lets a multi-stage unreachable chain (e.g. `align`
    /// skip forcing `pii_detect` then `audio_redact` to skip in turn)
    /// resolve within one call instead of waiting for unrelated events.
    async fn advance_and_dispatch(&self, job_id: &JobId, now_ms: u64) -> Result<(), SchedulerError> {
        let Some(job) = self.store.get_job(job_id).await? else {
            return Err(SchedulerError::JobNotFound(*job_id));
        };
        let mut tasks = self.store.list_tasks_for_job(job_id).await?;
        let mut status_by_id: HashMap<TaskId, TaskStatus> = tasks.iter().map(|t| (t.id, t.status)).collect();

        loop {
            let mut changed = false;

            for task in &mut tasks {
                if task.status != TaskStatus::Pending {
                    continue;
                }

                let blocked = task.dependencies.iter().any(|edge| {
                    status_by_id
                        .get(&edge.depends_on)
                        .map(|s| s.is_terminal() && !s.satisfies_dependency(edge.required_for_downstream))
                        .unwrap_or(false)
                });
                if blocked {
                    task.completed_at_ms = Some(now_ms);
                    let error = txctl_core::StageError::new(
                        txctl_core::ErrorKind::DependencySkipped,
                        "scheduler",
                        "a hard dependency was skipped or cancelled, making this task unreachable",
                    )
                    .with_correlation(task.correlation.clone());

                    if task.required {
                        task.status = TaskStatus::Failed;
                        task.error = Some(error.clone());
                        self.store.put_task(task.clone()).await?;
                        self.append_audit(
                            AuditAction::TaskFailedTerminal,
                            AuditSubjectKind::Task,
                            task.id.to_string(),
                            Some(error.message.clone()),
                            task.correlation.clone(),
                            now_ms,
                        )
                        .await?;
                        self.publish_progress(
                            *job_id,
                            ProgressBusEvent::TaskFailed { task_id: task.id, job_id: *job_id, error },
                        )
                        .await;
                        // `fail_job` cancels every other non-terminal task
                        // itself (it does not re-enter `advance_and_dispatch`),
                        // so returning immediately avoids acting on a
                        // `tasks` snapshot that a later pass would find stale.
                        self.fail_job(job_id, "a required task became unreachable".to_string(), now_ms).await?;
                        return Ok(());
                    }

                    task.status = TaskStatus::Skipped;
                    self.store.put_task(task.clone()).await?;
                    self.publish_progress(
                        *job_id,
                        ProgressBusEvent::TaskCompleted { task_id: task.id, job_id: *job_id, status: task.status },
                    )
                    .await;
                    status_by_id.insert(task.id, task.status);
                    changed = true;
                    continue;
                }

                let satisfied = task.dependencies.iter().all(|edge| {
                    status_by_id
                        .get(&edge.depends_on)
                        .map(|s| s.satisfies_dependency(edge.required_for_downstream))
                        .unwrap_or(false)
                });
                if !satisfied {
                    continue;
                }
                task.status = TaskStatus::Ready;
                self.store.put_task(task.clone()).await?;
                status_by_id.insert(task.id, task.status);
                changed = true;
                if !self.try_dispatch(task, &job, now_ms).await? {
                    self.park(task.id, now_ms, None).await?;
                }
            }

            if !changed {
                break;
            }
        }
        Ok(())
    }

    /// One sweep over parked (`ready`, no live engine yet) tasks: retry
    /// dispatch for any whose backoff has elapsed, fail terminally any
    /// that have waited past `T_dispatch_deadline`. Intended to be
    /// driven by [`Scheduler::run`]'s ticker at `T_dispatch_retry`
    /// cadence. Returns the number of tasks newly dispatched.
    pub async fn dispatch_pending_sweep(&self, now_ms: u64) -> Result<u32, SchedulerError> {
        let mut dispatched = 0;
        for member in self.kv.set_members(DISPATCH_PENDING_SET).await? {
            let task_id = TaskId::from_string(&member);
            let Some(mut task) = self.store.get_task(&task_id).await? else {
                self.unpark(task_id).await?;
                continue;
            };
            if task.status != TaskStatus::Ready {
                self.unpark(task_id).await?;
                continue;
            }
            if !self.owns_shard(&task.job_id).await? {
                continue;
            }

            let ready_since = self
                .kv
                .hash_get(DISPATCH_READY_SINCE, &member)
                .await?
                .and_then(|v| v.as_u64())
                .unwrap_or(now_ms);
            if now_ms.saturating_sub(ready_since) > self.dispatch_deadline.as_millis() as u64 {
                self.unpark(task_id).await?;
                let error = txctl_core::StageError::new(
                    txctl_core::ErrorKind::EngineUnavailable,
                    "scheduler",
                    "no live engine became available before the dispatch deadline",
                )
                .with_correlation(task.correlation.clone());
                self.fail_task_terminal(task, error, now_ms).await?;
                continue;
            }

            let retry_at = self.kv.hash_get(DISPATCH_RETRY_AT, &member).await?.and_then(|v| v.as_u64()).unwrap_or(0);
            if now_ms < retry_at {
                continue;
            }

            let Some(job) = self.store.get_job(&task.job_id).await? else {
                self.unpark(task_id).await?;
                continue;
            };
            if self.try_dispatch(&mut task, &job, now_ms).await? {
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    /// Writes the task payload to its resolved engine's queue and
    /// advances it to `running`, or returns `false` if no engine is
    /// currently live for it (spec §4.3 "Dispatch").
    async fn try_dispatch(&self, task: &mut Task, job: &Job, now_ms: u64) -> Result<bool, SchedulerError> {
        if !self.registry.is_available(&task.engine_id, now_ms).await? {
            return Ok(false);
        }
        let Some(engine_state) = self.registry.get_state(&task.engine_id).await? else {
            return Ok(false);
        };

        let mut prior_outputs = HashMap::new();
        for edge in &task.dependencies {
            if let Some(dep) = self.store.get_task(&edge.depends_on).await? {
                if let Some(uri) = dep.output_artifact_uri.clone() {
                    prior_outputs.insert(dep.stage, uri);
                }
            }
        }

        let payload = TaskPayload {
            task_id: task.id,
            job_id: task.job_id,
            stage: task.stage,
            engine_id: task.engine_id.clone(),
            audio_uri: job.audio_uri.clone(),
            prior_outputs,
            config: serde_json::json!({ "model": job.parameters.model, "language": job.parameters.language }),
            enqueued_at_ms: now_ms,
            correlation: task.correlation.clone(),
        };
        self.kv.queue_push(&engine_state.queue_name, serde_json::to_value(&payload)?).await?;

        task.status = TaskStatus::Running;
        task.queued_at_ms = Some(now_ms);
        task.started_at_ms = Some(now_ms);
        self.store.put_task(task.clone()).await?;
        self.unpark(task.id).await?;
        self.publish_progress(task.job_id, ProgressBusEvent::TaskStarted { task_id: task.id, job_id: task.job_id })
            .await;
        Ok(true)
    }

    async fn park(&self, task_id: TaskId, now_ms: u64, retry_at_ms: Option<u64>) -> Result<(), SchedulerError> {
        self.kv.set_add(DISPATCH_PENDING_SET, task_id.as_str()).await?;
        if self.kv.hash_get(DISPATCH_READY_SINCE, task_id.as_str()).await?.is_none() {
            self.kv.hash_set(DISPATCH_READY_SINCE, task_id.as_str(), serde_json::json!(now_ms)).await?;
        }
        if let Some(at) = retry_at_ms {
            self.kv.hash_set(DISPATCH_RETRY_AT, task_id.as_str(), serde_json::json!(at)).await?;
        }
        Ok(())
    }

    async fn unpark(&self, task_id: TaskId) -> Result<(), SchedulerError> {
        self.kv.set_remove(DISPATCH_PENDING_SET, task_id.as_str()).await?;
        self.kv.hash_delete(DISPATCH_READY_SINCE, task_id.as_str()).await?;
        self.kv.hash_delete(DISPATCH_RETRY_AT, task_id.as_str()).await?;
        Ok(())
    }

    // --- Terminal transitions ---

    /// Fails `task` terminally. A required task cascades to job failure
    /// and cancels every other non-terminal task (spec §4.3); a
    /// non-required task is instead marked `skipped` and its downstream
    /// `required_for_downstream=false` dependents remain schedulable
    /// (spec §4.3 "Partial-failure policy").
    async fn fail_task_terminal(
        &self,
        mut task: Task,
        error: txctl_core::StageError,
        now_ms: u64,
    ) -> Result<(), SchedulerError> {
        task.completed_at_ms = Some(now_ms);
        let message = error.message.clone();
        task.error = Some(error.clone());

        if task.required {
            task.status = TaskStatus::Failed;
            self.store.put_task(task.clone()).await?;
            self.append_audit(
                AuditAction::TaskFailedTerminal,
                AuditSubjectKind::Task,
                task.id.to_string(),
                Some(message.clone()),
                task.correlation.clone(),
                now_ms,
            )
            .await?;
            self.publish_progress(
                task.job_id,
                ProgressBusEvent::TaskFailed { task_id: task.id, job_id: task.job_id, error },
            )
            .await;
            self.fail_job(&task.job_id, message, now_ms).await
        } else {
            task.status = TaskStatus::Skipped;
            self.store.put_task(task.clone()).await?;
            self.publish_progress(
                task.job_id,
                ProgressBusEvent::TaskCompleted { task_id: task.id, job_id: task.job_id, status: task.status },
            )
            .await;
            self.advance_and_dispatch(&task.job_id, now_ms).await?;
            self.maybe_finalize_job(&task.job_id, now_ms).await
        }
    }

    async fn fail_job(&self, job_id: &JobId, message: String, now_ms: u64) -> Result<(), SchedulerError> {
        let Some(mut job) = self.store.get_job(job_id).await? else {
            return Ok(());
        };
        if job.status.is_terminal() {
            return Ok(());
        }
        job.status = JobStatus::Failed;
        job.completed_at_ms = Some(now_ms);
        job.error = Some(message.clone());
        self.store.put_job(job.clone()).await?;
        self.append_audit(
            AuditAction::JobFailed,
            AuditSubjectKind::Job,
            job_id.to_string(),
            Some(message.clone()),
            job.correlation,
            now_ms,
        )
        .await?;
        self.cancel_non_terminal_tasks(job_id, now_ms).await?;
        self.publish_progress(*job_id, ProgressBusEvent::JobFailed { job_id: *job_id, error: message }).await;
        Ok(())
    }

    /// Cancels every non-terminal task in `job_id` (spec §4.3
    /// "Cancellation"): best-effort for `running` tasks via a
    /// `cancel:{task_id}` pub/sub message engines poll between I/O
    /// steps; immediate for `pending`/`ready` tasks since nothing is
    /// in flight to interrupt.
    async fn cancel_non_terminal_tasks(&self, job_id: &JobId, now_ms: u64) -> Result<(), SchedulerError> {
        for mut task in self.store.list_tasks_for_job(job_id).await? {
            if task.status.is_terminal() {
                continue;
            }
            let was_running = task.status == TaskStatus::Running;
            task.status = TaskStatus::Cancelled;
            task.completed_at_ms = Some(now_ms);
            self.store.put_task(task.clone()).await?;
            self.unpark(task.id).await?;
            if was_running {
                let _ = self
                    .kv
                    .publish(&format!("cancel:{}", task.id), serde_json::json!({ "task_id": task.id.to_string() }))
                    .await;
            }
        }
        Ok(())
    }

    /// Transitions the job to `completed` once every task has reached a
    /// terminal state with none `failed`/`cancelled` (P1). No-op
    /// otherwise, or if the job already reached a terminal state via
    /// [`Scheduler::fail_job`] / cancellation.
    async fn maybe_finalize_job(&self, job_id: &JobId, now_ms: u64) -> Result<(), SchedulerError> {
        let Some(mut job) = self.store.get_job(job_id).await? else {
            return Ok(());
        };
        if job.status.is_terminal() {
            return Ok(());
        }
        let tasks = self.store.list_tasks_for_job(job_id).await?;
        if tasks.is_empty() || !tasks.iter().all(|t| t.status.is_terminal()) {
            return Ok(());
        }
        if tasks.iter().any(|t| matches!(t.status, TaskStatus::Failed | TaskStatus::Cancelled)) {
            return Ok(());
        }

        job.status = JobStatus::Completed;
        job.completed_at_ms = Some(now_ms);
        job.final_transcript_uri =
            tasks.iter().find(|t| t.stage == Stage::Merge).and_then(|t| t.output_artifact_uri.clone());
        self.store.put_job(job.clone()).await?;
        self.append_audit(
            AuditAction::JobCompleted,
            AuditSubjectKind::Job,
            job_id.to_string(),
            None,
            job.correlation,
            now_ms,
        )
        .await?;
        self.publish_progress(*job_id, ProgressBusEvent::JobCompleted { job_id: *job_id }).await;
        Ok(())
    }

    async fn append_audit(
        &self,
        action: AuditAction,
        subject_kind: AuditSubjectKind,
        subject_id: String,
        detail: Option<String>,
        correlation: txctl_core::Correlation,
        now_ms: u64,
    ) -> Result<(), SchedulerError> {
        let entry = AuditEntry {
            id: AuditId::new(),
            occurred_at_ms: now_ms,
            actor: "scheduler".to_string(),
            action,
            subject_kind,
            subject_id,
            detail,
            correlation,
        };
        self.store.append_audit(entry).await?;
        Ok(())
    }

    /// Best-effort: a dropped progress event never blocks a state
    /// transition (the poll surface in [`crate::progress`] is the
    /// consistent source of truth; the push surface is a convenience).
    async fn publish_progress(&self, job_id: JobId, event: ProgressBusEvent) {
        match serde_json::to_value(&event) {
            Ok(value) => {
                if let Err(err) = self.kv.publish(&progress_channel(job_id), value).await {
                    warn!(error = %err, job_id = %job_id, "failed to publish progress event");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize progress event"),
        }
    }

    /// Subscribes to the four reducer channels and runs both the
    /// event-driven reducer and the periodic dispatch-retry sweep until
    /// `shutdown` fires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut job_created = self.kv.subscribe("job.created");
        let mut task_completed = self.kv.subscribe("task.completed");
        let mut job_cancel = self.kv.subscribe("job.cancel_requested");
        let mut engine_offline = self.kv.subscribe("engine.offline");
        let mut ticker = tokio::time::interval(self.dispatch_retry);

        loop {
            let now_ms = self.now_ms().await;
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler shutting down");
                        break;
                    }
                }
                Ok(value) = job_created.recv() => self.dispatch_parsed(value, now_ms).await,
                Ok(value) = task_completed.recv() => self.dispatch_parsed(value, now_ms).await,
                Ok(value) = job_cancel.recv() => self.dispatch_parsed(value, now_ms).await,
                Ok(value) = engine_offline.recv() => self.dispatch_parsed(value, now_ms).await,
                _ = ticker.tick() => {
                    match self.dispatch_pending_sweep(now_ms).await {
                        Ok(n) if n > 0 => info!(dispatched = n, "dispatch retry sweep"),
                        Ok(_) => {}
                        Err(err) => warn!(error = %err, "dispatch retry sweep failed"),
                    }
                }
            }
        }
    }

    async fn dispatch_parsed(&self, value: serde_json::Value, now_ms: u64) {
        match serde_json::from_value::<SchedulerEvent>(value) {
            Ok(event) => {
                if let Err(err) = self.handle_event(event, now_ms).await {
                    warn!(error = %err, "scheduler event handling failed");
                }
            }
            Err(err) => warn!(error = %err, "malformed scheduler event, dropping"),
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
