// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook Delivery entity (spec §3, §4.6).

use crate::ids::{DeliveryId, EndpointId};
use serde::{Deserialize, Serialize};

/// Fixed retry schedule: attempt index -> delay before that attempt,
/// in seconds. Index 0 is the first (immediate) attempt.
pub const RETRY_SCHEDULE_SECS: [u64; 5] = [0, 30, 120, 600, 3600];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
    Dead,
}

txctl_core::simple_display! {
    DeliveryStatus {
        Pending => "pending",
        Delivered => "delivered",
        Failed => "failed",
        Dead => "dead",
    }
}

/// Lifecycle event types a webhook payload can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    JobCompleted,
    JobFailed,
    JobCancelled,
}

txctl_core::simple_display! {
    WebhookEventType {
        JobCompleted => "job.completed",
        JobFailed => "job.failed",
        JobCancelled => "job.cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: DeliveryId,
    pub endpoint_id: EndpointId,
    /// Ad-hoc URL override, when the job specified `webhook_endpoint`
    /// directly instead of (or in addition to) a registered endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_override: Option<String>,
    pub event_type: WebhookEventType,
    pub payload: serde_json::Value,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub next_retry_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl WebhookDelivery {
    /// Whether `attempts` has exhausted the fixed retry schedule
    /// (spec §4.6: 5 attempts total).
    pub fn exhausted(&self) -> bool {
        self.attempts as usize >= RETRY_SCHEDULE_SECS.len()
    }

    /// Delay, in seconds, before the next attempt after `attempts` have
    /// already been made. Returns `None` once the schedule is exhausted.
    pub fn next_delay_secs(attempts: u32) -> Option<u64> {
        RETRY_SCHEDULE_SECS.get(attempts as usize).copied()
    }
}
