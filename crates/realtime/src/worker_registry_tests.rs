// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tx_storage::InMemoryKv;

async fn registered_worker(kv: InMemoryKv, capacity: u32) -> (KvWorkerRegistry<InMemoryKv>, WorkerId) {
    let registry = KvWorkerRegistry::new(kv);
    let worker_id = WorkerId::new();
    registry
        .register(
            worker_id,
            "http://worker-a:7000".to_string(),
            capacity,
            vec!["fast".to_string()],
            vec!["en".to_string()],
            1_000,
        )
        .await
        .unwrap();
    (registry, worker_id)
}

#[tokio::test]
async fn register_makes_worker_visible_with_zero_active_sessions() {
    let (registry, worker_id) = registered_worker(InMemoryKv::new(), 4).await;
    let state = registry.get_worker(&worker_id).await.unwrap().unwrap();
    assert_eq!(state.capacity, 4);
    assert_eq!(state.active_sessions, 0);
    assert_eq!(state.status, EngineStatus::Idle);
}

#[tokio::test]
async fn try_acquire_increments_until_capacity_then_refuses() {
    let (registry, worker_id) = registered_worker(InMemoryKv::new(), 2).await;
    assert!(registry.try_acquire(&worker_id).await.unwrap());
    assert!(registry.try_acquire(&worker_id).await.unwrap());
    assert!(!registry.try_acquire(&worker_id).await.unwrap());

    let state = registry.get_worker(&worker_id).await.unwrap().unwrap();
    assert_eq!(state.active_sessions, 2, "a refused acquire must not leak an increment");
}

#[tokio::test]
async fn release_decrements_and_frees_a_slot() {
    let (registry, worker_id) = registered_worker(InMemoryKv::new(), 1).await;
    assert!(registry.try_acquire(&worker_id).await.unwrap());
    assert!(!registry.try_acquire(&worker_id).await.unwrap());

    registry.release(&worker_id).await.unwrap();
    assert!(registry.try_acquire(&worker_id).await.unwrap());
}

#[tokio::test]
async fn unregister_marks_offline_and_removes_from_listing() {
    let (registry, worker_id) = registered_worker(InMemoryKv::new(), 4).await;
    registry.unregister(&worker_id).await.unwrap();
    assert!(registry.list_workers().await.unwrap().is_empty());
    assert_eq!(registry.get_worker(&worker_id).await.unwrap().unwrap().status, EngineStatus::Offline);
}

#[tokio::test]
async fn heartbeat_from_unknown_worker_errors() {
    let registry = KvWorkerRegistry::new(InMemoryKv::new());
    let err = registry.heartbeat(&WorkerId::new(), EngineStatus::Idle, 1_000).await;
    assert!(matches!(err, Err(WorkerRegistryError::NotFound(_))));
}
