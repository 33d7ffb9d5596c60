// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pii_tier_off_does_not_require_pii_detect() {
    assert!(!PiiDetectionTier::Off.requires_pii_detect());
    assert!(PiiDetectionTier::Standard.requires_pii_detect());
    assert!(PiiDetectionTier::Strict.requires_pii_detect());
}

#[test]
fn terminal_statuses() {
    assert!(JobStatus::Completed.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
    assert!(!JobStatus::Pending.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
}

#[test]
fn builder_produces_a_pending_job_by_default() {
    let job = Job::builder().build();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.tenant, TenantId::from("test-tenant"));
}

#[test]
fn builder_setters_override_defaults() {
    let job = Job::builder().status(JobStatus::Completed).audio_duration_secs(120.0).build();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.audio_duration_secs, 120.0);
}

#[test]
fn job_status_round_trips_through_json() {
    let json = serde_json::to_string(&JobStatus::Running).unwrap();
    assert_eq!(json, "\"running\"");
    let back: JobStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(back, JobStatus::Running);
}
