// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy (spec §7).
//!
//! [`ErrorKind`] names the classes of failure the control plane
//! recognizes; [`StageError`] is the concrete error type threaded
//! through task completion events, webhook payloads, and audit log
//! entries. Per-crate error enums (`SchedulerError`, `RegistryError`,
//! `RouterError`, `WebhookError`, `HarnessError`) wrap or convert into
//! this shared type rather than redefining the taxonomy.

use crate::correlation::Correlation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure classes from spec §7's error table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Reject job at submission; never enqueued.
    ConfigurationError,
    /// Terminal after `T_dispatch_deadline`.
    EngineUnavailable,
    /// Retryable up to `max_retries`.
    InputFetchError,
    /// Retryable up to `max_retries`.
    OutputUploadError,
    /// Engine-classified; retried iff the engine's `retryable` flag is set.
    ProcessingError,
    /// Deadline-breached operation; retryable.
    Timeout,
    /// Propagates without retry.
    Cancelled,
    /// Derived: an optional upstream stage was skipped.
    DependencySkipped,
    /// Transient; retryable by the realtime client.
    CapacityExhausted,
    /// Terminal for the bound session; not for the job.
    WorkerCrash,
}

impl ErrorKind {
    /// Whether this kind is retried by the scheduler without engine input.
    ///
    /// `ProcessingError` is excluded: its retryability is decided by the
    /// engine's own `retryable` flag on the completion event, not by kind
    /// alone (spec §4.3 "Retry classification").
    pub fn is_unconditionally_retryable(self) -> bool {
        matches!(self, ErrorKind::InputFetchError | ErrorKind::OutputUploadError | ErrorKind::Timeout)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ErrorKind::ConfigurationError
                | ErrorKind::EngineUnavailable
                | ErrorKind::Cancelled
                | ErrorKind::WorkerCrash
        )
    }
}

crate::simple_display! {
    ErrorKind {
        ConfigurationError => "configuration_error",
        EngineUnavailable => "engine_unavailable",
        InputFetchError => "input_fetch_error",
        OutputUploadError => "output_upload_error",
        ProcessingError => "processing_error",
        Timeout => "timeout",
        Cancelled => "cancelled",
        DependencySkipped => "dependency_skipped",
        CapacityExhausted => "capacity_exhausted",
        WorkerCrash => "worker_crash",
    }
}

/// A control-plane error: kind, human message, originating component,
/// optional chained cause, and correlation ids.
///
/// Never constructed and dropped silently — callers that terminally fail
/// a task or session are expected to also write an audit log entry
/// (spec §7 "unrecoverable errors write an entry to the audit log").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Correlation>,
    /// Engine-reported retryable flag, when this error originated from a
    /// `ProcessingError` completion event rather than harness/scheduler code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_retryable: Option<bool>,
}

impl StageError {
    pub fn new(kind: ErrorKind, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            component: component.into(),
            cause: None,
            correlation: None,
            engine_retryable: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn with_correlation(mut self, correlation: Correlation) -> Self {
        self.correlation = Some(correlation);
        self
    }

    pub fn with_engine_retryable(mut self, retryable: bool) -> Self {
        self.engine_retryable = Some(retryable);
        self
    }

    /// Whether the scheduler should retry the task this error terminated,
    /// per spec §4.3's retry classification.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::ProcessingError => self.engine_retryable.unwrap_or(false),
            other => other.is_unconditionally_retryable(),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.component, self.kind, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by: {})", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for StageError {}
