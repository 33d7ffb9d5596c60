// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::engine::EngineStatus;

fn worker(capacity: u32, active: u32) -> RealtimeWorkerState {
    RealtimeWorkerState {
        worker_id: WorkerId::new(),
        endpoint: "grpc://worker-a:9000".to_string(),
        status: EngineStatus::Idle,
        capacity,
        active_sessions: active,
        loaded_models: vec!["fast".to_string()],
        supported_languages: vec!["en".to_string()],
        last_heartbeat_ms: 1_000,
        registered_at_ms: 0,
    }
}

#[test]
fn free_capacity_and_available_slots() {
    let w = worker(4, 1);
    assert!(w.has_free_capacity());
    assert_eq!(w.available_slots(), 3);
}

#[test]
fn at_capacity_has_no_free_slots() {
    let w = worker(2, 2);
    assert!(!w.has_free_capacity());
    assert_eq!(w.available_slots(), 0);
}

#[test]
fn supports_language_accepts_auto() {
    let mut w = worker(1, 0);
    w.supported_languages = vec!["auto".to_string()];
    assert!(w.supports_language("fr"));
}

#[test]
fn supports_language_rejects_unlisted() {
    let w = worker(1, 0);
    assert!(!w.supports_language("fr"));
    assert!(w.supports_language("en"));
}

#[test]
fn session_terminal_status() {
    assert!(!SessionStatus::Active.is_terminal());
    assert!(SessionStatus::Completed.is_terminal());
    assert!(SessionStatus::Interrupted.is_terminal());
    assert!(SessionStatus::Error.is_terminal());
}
