// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::KvEngineRegistry;
use tx_storage::InMemoryKv;
use tx_wire::EngineIdentity;

fn identity(name: &str) -> EngineIdentity {
    EngineIdentity {
        engine_id: tx_wire::EngineId::new(name),
        stage: Stage::Transcribe,
        queue_name: "queue:transcribe".to_string(),
        capabilities: vec![],
    }
}

#[tokio::test]
async fn sweep_marks_stale_engine_offline_and_publishes() {
    let kv = InMemoryKv::new();
    let clock = txctl_core::FakeClock::new();
    clock.set_epoch_ms(1_000);
    let registry = KvEngineRegistry::new(kv.clone());
    registry.register(identity("whisper-large-v3"), clock.epoch_ms()).await.unwrap();

    let mut offline_events = kv.subscribe("engine.offline");
    let sweeper = StaleEngineSweeper::new(registry, kv.clone(), clock.clone())
        .with_stale_after(Duration::from_millis(500));

    // Not yet stale: sweep is a no-op.
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

    clock.set_epoch_ms(1_000 + 501);
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);

    let event = offline_events.recv().await.unwrap();
    assert_eq!(event["engine_id"], "whisper-large-v3");

    // Second pass finds nothing left to sweep.
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
}

#[tokio::test]
async fn fresh_heartbeat_survives_a_sweep() {
    let kv = InMemoryKv::new();
    let clock = txctl_core::FakeClock::new();
    clock.set_epoch_ms(1_000);
    let registry = KvEngineRegistry::new(kv.clone());
    registry.register(identity("whisper-large-v3"), clock.epoch_ms()).await.unwrap();

    let sweeper =
        StaleEngineSweeper::new(registry, kv, clock.clone()).with_stale_after(Duration::from_millis(500));
    clock.set_epoch_ms(1_000 + 100);
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
}
