// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine Identity and Engine State (spec §3, §4.2).
//!
//! Identity is configuration (authored once, never created at runtime);
//! State is volatile liveness data that lives in the KV coordinator.

use crate::ids::EngineId;
use crate::task::Stage;
use serde::{Deserialize, Serialize};

/// Persistent reference data: which stage an engine variant implements,
/// which queue it pulls from, and its declared capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineIdentity {
    pub engine_id: EngineId,
    pub stage: Stage,
    pub queue_name: String,
    pub capabilities: Vec<String>,
}

/// Volatile liveness status of a registered engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Idle,
    Processing,
    Draining,
    Offline,
}

txctl_core::simple_display! {
    EngineStatus {
        Idle => "idle",
        Processing => "processing",
        Draining => "draining",
        Offline => "offline",
    }
}

/// Volatile liveness record keyed by `engine_id` (spec §3 "Engine State").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub engine_id: EngineId,
    /// Queue the scheduler writes dispatched task payloads to (spec §4.3
    /// "writes the task payload... to the engine's FIFO queue in C1").
    pub queue_name: String,
    pub status: EngineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<crate::ids::TaskId>,
    pub last_heartbeat_ms: u64,
    pub registered_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl EngineState {
    /// Whether this state's heartbeat is still fresh given `now_ms` and
    /// the configured staleness threshold (spec I4).
    pub fn is_fresh(&self, now_ms: u64, stale_after_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_heartbeat_ms) <= stale_after_ms
    }
}
