// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn job_id_has_expected_prefix() {
    let id = JobId::new();
    assert!(id.as_str().starts_with("job-"));
}

#[test]
fn task_id_round_trips() {
    let id = TaskId::from_string("tsk-abc123");
    assert_eq!(id.as_str(), "tsk-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn engine_id_is_a_stable_name_not_a_generated_id() {
    let a = EngineId::new("whisper-large-v3");
    let b = EngineId::new("whisper-large-v3");
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "whisper-large-v3");
}

#[test]
fn engine_id_usable_as_hash_map_key_by_str_borrow() {
    let mut map: HashMap<EngineId, u32> = HashMap::new();
    map.insert(EngineId::new("align-v1"), 1);
    assert_eq!(map.get("align-v1".to_string().as_str()).copied(), None); // &str lookup needs Borrow<str>
    assert!(map.contains_key(&EngineId::new("align-v1")));
}

#[test]
fn tenant_id_displays_as_inner_string() {
    let t = TenantId::from("acme-corp");
    assert_eq!(t.to_string(), "acme-corp");
}
