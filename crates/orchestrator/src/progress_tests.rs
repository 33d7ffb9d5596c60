// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dag::{build_dag, EngineVariantTable};
use tx_storage::{InMemoryDs, InMemoryKv};
use tx_wire::JobBuilder;

fn job_with_tasks() -> (tx_wire::Job, Vec<Task>) {
    let job = JobBuilder::new().build();
    let tasks = build_dag(&job, &EngineVariantTable::new()).unwrap();
    (job, tasks)
}

#[tokio::test]
async fn poll_snapshot_reports_none_for_tasks_without_a_progress_record() {
    let store = InMemoryDs::new();
    let kv = InMemoryKv::new();
    let (job, tasks) = job_with_tasks();
    store.create_job_with_tasks(job.clone(), tasks.clone()).await.unwrap();

    let snapshot = poll_snapshot(&store, &kv, job.id).await.unwrap();

    assert_eq!(snapshot.job.id, job.id);
    assert_eq!(snapshot.tasks.len(), tasks.len());
    assert!(snapshot.tasks.iter().all(|t| t.progress.is_none()));
}

#[tokio::test]
async fn poll_snapshot_surfaces_the_last_published_progress_record() {
    let store = InMemoryDs::new();
    let kv = InMemoryKv::new();
    let (job, tasks) = job_with_tasks();
    store.create_job_with_tasks(job.clone(), tasks.clone()).await.unwrap();

    let target = tasks[0].id;
    let record = ProgressRecord::new(target, 55, Some("halfway".to_string()), 1_000);
    kv.set_with_ttl(
        &format!("progress:{}", target.as_str()),
        serde_json::to_value(&record).unwrap(),
        std::time::Duration::from_secs(60),
    )
    .await
    .unwrap();

    let snapshot = poll_snapshot(&store, &kv, job.id).await.unwrap();

    let view = snapshot.tasks.iter().find(|t| t.task.id == target).unwrap();
    assert_eq!(view.progress.as_ref().unwrap().percent, 55);
}

#[tokio::test]
async fn poll_snapshot_rejects_an_unknown_job() {
    let store = InMemoryDs::new();
    let kv = InMemoryKv::new();

    let err = poll_snapshot(&store, &kv, JobId::new()).await.unwrap_err();

    assert!(matches!(err, ProgressError::JobNotFound(_)));
}

#[test]
fn snapshot_to_event_carries_every_task() {
    let job = JobBuilder::new().build();
    let (_, tasks) = job_with_tasks();
    let snapshot = JobProgressSnapshot {
        job: job.clone(),
        tasks: tasks.iter().cloned().map(|task| TaskProgressView { task, progress: None }).collect(),
    };

    let event = snapshot_to_event(&snapshot);
    match event {
        ProgressBusEvent::Snapshot { job: snap_job, tasks: snap_tasks } => {
            assert_eq!(snap_job.id, job.id);
            assert_eq!(snap_tasks.len(), tasks.len());
        }
        other => panic!("expected Snapshot, got {other:?}"),
    }
}
