// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Correlation identifiers carried through every queue payload, every
//! pub/sub event, and every log record.
//!
//! Per the re-architecture guidance in spec §9 ("per-request correlation
//! propagation"), binding happens at event dequeue — nothing is stashed
//! in thread-local or process-global state.

use serde::{Deserialize, Serialize};

/// `(request_id, trace_id, span_id)` bundle threaded through the system.
///
/// Cloned into every task payload, completion event, and log span. Never
/// looked up from ambient state: callers construct one at the boundary
/// (job submission, queue dequeue) and pass it down explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub request_id: String,
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span: Option<String>,
}

impl Correlation {
    pub fn new(request_id: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self { request_id: request_id.into(), trace_id: trace_id.into(), parent_span: None }
    }

    pub fn with_parent_span(mut self, span: impl Into<String>) -> Self {
        self.parent_span = Some(span.into());
        self
    }

    /// Derive a child correlation for a downstream task, keeping the
    /// same request/trace identifiers but recording the new parent span.
    pub fn child_span(&self, span: impl Into<String>) -> Self {
        Self {
            request_id: self.request_id.clone(),
            trace_id: self.trace_id.clone(),
            parent_span: Some(span.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_no_parent_span() {
        let c = Correlation::new("req-1", "trace-1");
        assert_eq!(c.request_id, "req-1");
        assert_eq!(c.trace_id, "trace-1");
        assert!(c.parent_span.is_none());
    }

    #[test]
    fn child_span_preserves_request_and_trace() {
        let c = Correlation::new("req-1", "trace-1").with_parent_span("span-a");
        let child = c.child_span("span-b");
        assert_eq!(child.request_id, "req-1");
        assert_eq!(child.trace_id, "trace-1");
        assert_eq!(child.parent_span.as_deref(), Some("span-b"));
    }
}
