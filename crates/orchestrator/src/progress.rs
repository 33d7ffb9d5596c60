// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C8 Progress Bus (spec §4.7): a poll snapshot assembled from C2/C1, and
//! an axum SSE router the (out-of-scope, spec §1) gateway mounts to get
//! the push surface. This crate owns the channel convention and the
//! event stream; it does not own authentication or routing beyond the
//! one `job_id` path segment the gateway forwards to it.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tx_storage::{DurableStore, KvStore};
use tx_wire::{JobId, ProgressBusEvent, ProgressRecord, Task};

/// Per-task progress as included in the poll surface: the task row plus
/// whatever the last published [`ProgressRecord`] says, or `None` when
/// the task hasn't reported yet (spec §4.7 "Poll surface").
#[derive(Debug, Clone, Serialize)]
pub struct TaskProgressView {
    pub task: Task,
    pub progress: Option<ProgressRecord>,
}

/// The full poll snapshot for a job: every task plus its last known
/// progress record. Also what a push-surface connection emits first,
/// as a synthetic [`ProgressBusEvent::Snapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct JobProgressSnapshot {
    pub job: tx_wire::Job,
    pub tasks: Vec<TaskProgressView>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error(transparent)]
    Store(#[from] tx_storage::DsError),
    #[error(transparent)]
    Kv(#[from] tx_storage::KvError),
}

/// Assembles the poll surface: `GET job` embeds this per spec §4.7.
/// Reads the job and its tasks from C2, then the mirrored progress
/// record for each task from C1, tolerating a missing record (a task
/// that hasn't reported yet, or whose TTL'd record expired).
pub async fn poll_snapshot<D: DurableStore, K: KvStore>(
    store: &D,
    kv: &K,
    job_id: JobId,
) -> Result<JobProgressSnapshot, ProgressError> {
    let job = store.get_job(&job_id).await?.ok_or(ProgressError::JobNotFound(job_id))?;
    let tasks = store.list_tasks_for_job(&job_id).await?;

    let mut views = Vec::with_capacity(tasks.len());
    for task in tasks {
        let key = format!("progress:{}", task.id.as_str());
        let progress = match kv.get(&key).await? {
            Some(value) => serde_json::from_value(value).ok(),
            None => None,
        };
        views.push(TaskProgressView { task, progress });
    }

    Ok(JobProgressSnapshot { job, tasks: views })
}

fn snapshot_to_event(snapshot: &JobProgressSnapshot) -> ProgressBusEvent {
    ProgressBusEvent::Snapshot {
        job: snapshot.job.clone(),
        tasks: snapshot.tasks.iter().map(|v| v.task.clone()).collect(),
    }
}

/// Shared handle the SSE route needs; cheap to clone, like the rest of
/// this codebase's `AppState` handles.
#[derive(Clone)]
pub struct ProgressBusState<D, K> {
    pub store: Arc<D>,
    pub kv: Arc<K>,
}

impl<D, K> ProgressBusState<D, K> {
    pub fn new(store: D, kv: K) -> Self {
        Self { store: Arc::new(store), kv: Arc::new(kv) }
    }
}

/// Builds the router a gateway mounts to expose the C8 push surface.
/// Routes:
/// - `GET /jobs/:job_id/progress` — poll snapshot as JSON.
/// - `GET /jobs/:job_id/progress/stream` — the SSE push surface.
pub fn router<D, K>(state: ProgressBusState<D, K>) -> Router
where
    D: DurableStore + Send + Sync + 'static,
    K: KvStore + Send + Sync + 'static,
{
    Router::new()
        .route("/jobs/{job_id}/progress", get(poll_handler::<D, K>))
        .route("/jobs/{job_id}/progress/stream", get(stream_handler::<D, K>))
        .with_state(state)
}

async fn poll_handler<D, K>(
    State(state): State<ProgressBusState<D, K>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobProgressSnapshot>, ProgressErrorResponse>
where
    D: DurableStore + Send + Sync + 'static,
    K: KvStore + Send + Sync + 'static,
{
    let job_id = JobId::from_string(job_id);
    let snapshot = poll_snapshot(state.store.as_ref(), state.kv.as_ref(), job_id).await?;
    Ok(Json(snapshot))
}

/// On connect: emits a synthetic `Snapshot` event, then forwards every
/// subsequent event on `progress:{job_id}` verbatim. No client cursor;
/// a reconnect just gets a fresh snapshot (spec §4.7 "Reconnects replay
/// from snapshot; no client cursor.").
async fn stream_handler<D, K>(
    State(state): State<ProgressBusState<D, K>>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ProgressErrorResponse>
where
    D: DurableStore + Send + Sync + 'static,
    K: KvStore + Send + Sync + 'static,
{
    let job_id = JobId::from_string(job_id);
    let snapshot = poll_snapshot(state.store.as_ref(), state.kv.as_ref(), job_id).await?;
    let snapshot_event = snapshot_to_event(&snapshot);
    let rx = state.kv.subscribe(&tx_wire::progress_channel(job_id));

    let stream = async_stream::stream! {
        yield to_sse_event(&snapshot_event);

        let mut rx = tokio_stream::wrappers::BroadcastStream::new(rx);
        while let Some(item) = rx.next().await {
            let Ok(value) = item else { continue };
            let Ok(event) = serde_json::from_value::<ProgressBusEvent>(value) else { continue };
            yield to_sse_event(&event);
            if matches!(event, ProgressBusEvent::JobCompleted { .. } | ProgressBusEvent::JobFailed { .. }) {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &ProgressBusEvent) -> Result<Event, Infallible> {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Ok(Event::default().data(data))
}

struct ProgressErrorResponse(ProgressError);

impl From<ProgressError> for ProgressErrorResponse {
    fn from(e: ProgressError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ProgressErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            ProgressError::JobNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
