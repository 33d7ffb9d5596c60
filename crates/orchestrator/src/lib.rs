// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
//! tx-orchestrator: C6 DAG Builder, C7 Orchestrator Scheduler, C8 Progress Bus.
//!
//! [`dag`] turns a submitted [`tx_wire::Job`] into its task graph.
//! [`scheduler`] is the single-writer reducer that drives those tasks
//! from `pending` through to a terminal state, dispatching to live
//! engines via C4/C1 and retrying or cancelling per spec §4.3.
//! [`progress`] serves the same task/job lifecycle as a poll snapshot
//! and a push (SSE) stream.

pub mod dag;
pub mod progress;
pub mod scheduler;

pub use dag::{EngineVariantTable, DEFAULT_MAX_RETRIES};
pub use progress::{poll_snapshot, JobProgressSnapshot, ProgressBusState, ProgressError, TaskProgressView};
pub use scheduler::{Scheduler, SchedulerError, T_DISPATCH_DEADLINE, T_DISPATCH_RETRY};

pub use tx_wire::progress_channel;
