// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C10 Webhook Dispatcher (spec §4.6).
//!
//! A poller claims due deliveries with skip-locked semantics (see
//! [`tx_storage::DurableStore::claim_due_deliveries`]), attempts an
//! HMAC-signed POST, and advances each row along its fixed retry
//! schedule until it reaches `delivered` or `dead` (P7: every delivery
//! reaches one of those, never lost, at most 5 attempts).

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use tx_storage::DurableStore;
use txctl_core::Correlation;
use tx_wire::{AuditAction, AuditEntry, AuditId, AuditSubjectKind, DeliveryStatus, WebhookDelivery};

use crate::endpoints::EndpointRegistry;
use crate::signing::sign;

/// Default poll cadence; the skip-locked claim makes running several
/// dispatcher replicas at this cadence safe (spec §5 "Webhook row
/// claims use skip-locked selects to safely parallelize dispatchers").
pub const T_WEBHOOK_POLL: Duration = Duration::from_secs(1);
/// Default per-attempt HTTP deadline.
pub const T_WEBHOOK_ATTEMPT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("durable store error: {0}")]
    Store(#[from] tx_storage::DsError),
    #[error("delivery {0} references an unknown endpoint")]
    UnknownEndpoint(String),
}

pub struct WebhookDispatcher<D, C> {
    store: D,
    clock: C,
    endpoints: Box<dyn EndpointRegistry>,
    client: reqwest::Client,
    claim_batch: usize,
    poll_interval: Duration,
}

impl<D, C> WebhookDispatcher<D, C>
where
    D: DurableStore,
    C: txctl_core::Clock,
{
    pub fn new(store: D, clock: C, endpoints: Box<dyn EndpointRegistry>) -> Self {
        let client =
            reqwest::Client::builder().timeout(T_WEBHOOK_ATTEMPT).build().unwrap_or_else(|_| reqwest::Client::new());
        Self { store, clock, endpoints, client, claim_batch: 20, poll_interval: T_WEBHOOK_POLL }
    }

    pub fn with_claim_batch(mut self, claim_batch: usize) -> Self {
        self.claim_batch = claim_batch;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn now_ms(&self) -> u64 {
        use txctl_core::Clock;
        self.clock.epoch_ms()
    }

    /// Claims due deliveries and attempts each once, returning the
    /// number of rows processed (delivered, retried, or dead-lettered).
    pub async fn poll_once(&self) -> Result<u32, WebhookError> {
        let now_ms = self.now_ms();
        let due = self.store.claim_due_deliveries(now_ms, self.claim_batch).await?;
        let mut processed = 0;
        for delivery in due {
            self.attempt(delivery, now_ms).await?;
            processed += 1;
        }
        Ok(processed)
    }

    async fn attempt(&self, mut delivery: WebhookDelivery, now_ms: u64) -> Result<(), WebhookError> {
        let (url, secret) = match (&delivery.url_override, self.endpoints.lookup(&delivery.endpoint_id)) {
            (Some(url), lookup) => (url.clone(), lookup.map(|e| e.secret).unwrap_or_default()),
            (None, Some(record)) => (record.url, record.secret),
            (None, None) => {
                warn!(delivery_id = %delivery.id, "dropping delivery with no resolvable endpoint");
                return Err(WebhookError::UnknownEndpoint(delivery.endpoint_id.to_string()));
            }
        };

        let body = serde_json::to_string(&delivery.payload).unwrap_or_default();
        let signature = sign(&secret, now_ms, &body);

        let result = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-webhook-signature", signature)
            .header("x-webhook-event", delivery.event_type.to_string())
            .body(body)
            .send()
            .await;

        delivery.attempts += 1;

        match result {
            Ok(response) if response.status().is_success() => {
                delivery.status = DeliveryStatus::Delivered;
                delivery.last_status_code = Some(response.status().as_u16());
                delivery.last_error = None;
                info!(delivery_id = %delivery.id, attempts = delivery.attempts, "webhook delivered");
                self.store.put_delivery(delivery).await?;
            }
            Ok(response) => {
                let status_code = response.status().as_u16();
                let error = format!("non-2xx response: {status_code}");
                self.finish_failed_attempt(delivery, now_ms, Some(status_code), error).await?;
            }
            Err(err) => {
                self.finish_failed_attempt(delivery, now_ms, None, err.to_string()).await?;
            }
        }
        Ok(())
    }

    async fn finish_failed_attempt(
        &self,
        mut delivery: WebhookDelivery,
        now_ms: u64,
        status_code: Option<u16>,
        error: String,
    ) -> Result<(), WebhookError> {
        delivery.last_status_code = status_code;
        delivery.last_error = Some(error.clone());

        if delivery.exhausted() {
            delivery.status = DeliveryStatus::Dead;
            warn!(delivery_id = %delivery.id, attempts = delivery.attempts, "webhook delivery dead-lettered");
            self.store.put_delivery(delivery.clone()).await?;
            self.store
                .append_audit(AuditEntry {
                    id: AuditId::new(),
                    occurred_at_ms: now_ms,
                    actor: "webhook-dispatcher".to_string(),
                    action: AuditAction::WebhookDead,
                    subject_kind: AuditSubjectKind::Webhook,
                    subject_id: delivery.id.to_string(),
                    detail: Some(error),
                    correlation: Correlation::new("", ""),
                })
                .await?;
        } else {
            let delay = WebhookDelivery::next_delay_secs(delivery.attempts).unwrap_or(3600);
            delivery.status = DeliveryStatus::Pending;
            delivery.next_retry_at_ms = now_ms + delay * 1000;
            warn!(delivery_id = %delivery.id, attempts = delivery.attempts, retry_in_s = delay, "webhook delivery attempt failed, will retry");
            self.store.put_delivery(delivery).await?;
        }
        Ok(())
    }

    /// Runs the poll loop until `shutdown` fires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(n) if n > 0 => info!(processed = n, "webhook dispatch poll"),
                        Ok(_) => {}
                        Err(err) => warn!(error = %err, "webhook dispatch poll failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("webhook dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
