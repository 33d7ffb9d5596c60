// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque identifiers for control-plane entities.
//!
//! `EngineId` is deliberately *not* one of these: per spec §3, an engine
//! identity is a stable logical name authored as configuration (e.g.
//! `whisper-large-v3`), not a randomly generated id.

txctl_core::define_id! {
    /// Identifies a transcription job.
    pub struct JobId("job-");
}

txctl_core::define_id! {
    /// Identifies a single task within a job's DAG.
    pub struct TaskId("tsk-");
}

txctl_core::define_id! {
    /// Identifies a realtime streaming session.
    pub struct SessionId("ses-");
}

txctl_core::define_id! {
    /// Identifies a realtime worker process (distinct from a batch `EngineId`
    /// name: realtime workers are pooled instances, not named variants).
    pub struct WorkerId("wkr-");
}

txctl_core::define_id! {
    /// Identifies a webhook endpoint registration.
    pub struct EndpointId("end-");
}

txctl_core::define_id! {
    /// Identifies a single webhook delivery attempt row.
    pub struct DeliveryId("dlv-");
}

txctl_core::define_id! {
    /// Identifies an append-only audit log entry.
    pub struct AuditId("adt-");
}

/// Stable logical engine name (e.g. `whisper-large-v3`, `pyannote-3.1`).
///
/// Authored as configuration and never generated at runtime (spec §3
/// "Engine Identity"), so it is a plain newtype around `String` rather
/// than an `IdBuf`-backed generated id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EngineId(pub String);

impl EngineId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EngineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EngineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for EngineId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Tenant identifier. A thin newtype rather than a generated id: tenants
/// are provisioned out of band (spec excludes the gateway's auth layer)
/// and referenced here only as an opaque scoping key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
