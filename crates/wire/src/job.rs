// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job entity and submission parameters (spec §3 "Job", §4.1).

use crate::ids::{JobId, TenantId};
use serde::{Deserialize, Serialize};

/// Word-level vs. segment-level timestamp granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampGranularity {
    None,
    Segment,
    Word,
}

/// Speaker detection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerDetection {
    None,
    Diarize,
}

/// PII-detection tier. `Standard`/`Strict` both require `pii_detect`;
/// `Strict` additionally tightens the detector's confidence threshold
/// (a detail owned by the engine, not the control plane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiDetectionTier {
    Off,
    Standard,
    Strict,
}

impl PiiDetectionTier {
    pub fn requires_pii_detect(self) -> bool {
        !matches!(self, PiiDetectionTier::Off)
    }
}

/// How PII is redacted in the final audio artifact, when requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionMode {
    None,
    Silence,
    Beep,
}

/// Retention policy values, snapshotted onto the Job at creation (I6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicySnapshot {
    pub policy_id: String,
    pub retain_audio_days: u32,
    pub retain_transcript_days: u32,
    pub retain_artifacts_days: u32,
}

/// Client-supplied parameters for a transcription job. Consumed by the
/// DAG builder (C6) to produce a task graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    pub language: String,
    pub model: String,
    pub timestamps_granularity: TimestampGranularity,
    pub speaker_detection: SpeakerDetection,
    pub pii_detection: PiiDetectionTier,
    pub redact_pii_audio: RedactionMode,
    pub retention: RetentionPolicySnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_endpoint: Option<String>,
}

/// Job lifecycle status (spec I3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

txctl_core::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant: TenantId,
    pub submitter: String,
    pub parameters: JobParameters,
    pub audio_uri: String,
    pub audio_duration_secs: f64,
    pub correlation: txctl_core::Correlation,
    pub status: JobStatus,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_transcript_uri: Option<String>,
}

txctl_core::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = JobId::new(),
            submitter: String = "test-user",
            audio_uri: String = "mem://audio/test.wav"
        }
        set {
            tenant: TenantId = TenantId::from("test-tenant"),
            audio_duration_secs: f64 = 5.0,
            status: JobStatus = JobStatus::Pending,
            created_at_ms: u64 = 1_000_000,
            updated_at_ms: u64 = 1_000_000
        }
        option {
            completed_at_ms: u64 = None,
            error: String = None,
            final_transcript_uri: String = None
        }
        computed {
            parameters: JobParameters = JobParameters {
                language: "en".to_string(),
                model: "fast".to_string(),
                timestamps_granularity: TimestampGranularity::Segment,
                speaker_detection: SpeakerDetection::None,
                pii_detection: PiiDetectionTier::Off,
                redact_pii_audio: RedactionMode::None,
                retention: RetentionPolicySnapshot {
                    policy_id: "default".to_string(),
                    retain_audio_days: 30,
                    retain_transcript_days: 90,
                    retain_artifacts_days: 30,
                },
                webhook_endpoint: None,
            },
            correlation: txctl_core::Correlation = txctl_core::Correlation::new("req-test", "trace-test")
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
