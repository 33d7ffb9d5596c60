// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime Session and Realtime Worker State (spec §3, §4.5).

use crate::ids::{SessionId, TenantId, WorkerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Interrupted,
    Error,
}

txctl_core::simple_display! {
    SessionStatus {
        Active => "active",
        Completed => "completed",
        Interrupted => "interrupted",
        Error => "error",
    }
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

/// Rolling stats accumulated over a session's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub audio_duration_secs: f64,
    pub utterance_count: u32,
    pub word_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSession {
    pub id: SessionId,
    pub tenant: TenantId,
    pub worker_id: WorkerId,
    pub language: String,
    pub model_tier: String,
    pub encoding: String,
    pub sample_rate_hz: u32,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_session_id: Option<SessionId>,
    pub stats: SessionStats,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_audio_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement_job_id: Option<crate::ids::JobId>,
}

/// Volatile liveness + capacity record for one realtime worker instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeWorkerState {
    pub worker_id: WorkerId,
    pub endpoint: String,
    pub status: crate::engine::EngineStatus,
    pub capacity: u32,
    pub active_sessions: u32,
    pub loaded_models: Vec<String>,
    pub supported_languages: Vec<String>,
    pub last_heartbeat_ms: u64,
    pub registered_at_ms: u64,
}

impl RealtimeWorkerState {
    pub fn has_free_capacity(&self) -> bool {
        self.active_sessions < self.capacity
    }

    pub fn available_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.active_sessions)
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.supported_languages.iter().any(|l| l == language || l == "auto")
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.loaded_models.iter().any(|m| m == model)
    }

    pub fn is_fresh(&self, now_ms: u64, stale_after_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_heartbeat_ms) <= stale_after_ms
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
