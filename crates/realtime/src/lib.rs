// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
//! tx-realtime: C9 Realtime Session Router.
//!
//! Allocates, tracks, and reaps streaming sessions against the realtime
//! worker pool. Worker liveness/capacity lives in the KV coordinator
//! (volatile, same lifecycle as batch Engine State per spec §3); Session
//! rows are durable, owned by [`tx_storage::DurableStore`].

mod health;
mod router;
mod worker_registry;

pub use health::SessionHealthLoop;
pub use router::{AcquireWorkerRequest, RouterError, SessionRouter};
pub use worker_registry::{KvWorkerRegistry, RealtimeWorkerRegistry, WorkerRegistryError};

use std::time::Duration;

/// Health-loop cadence (spec §4.5 "Health loop... every 10 s").
pub const T_HEALTH_LOOP: Duration = Duration::from_secs(10);
/// Worker offline threshold (spec §4.5 "heartbeat age > 30 s").
pub const T_WORKER_STALE: Duration = Duration::from_secs(30);
/// Default realtime idle cutoff (spec §6 `session_idle_timeout`).
pub const T_SESSION_IDLE: Duration = Duration::from_secs(30);
/// Default realtime max session duration (spec §6 `session_max_duration`).
pub const T_SESSION_MAX_DURATION: Duration = Duration::from_secs(4 * 3600);
