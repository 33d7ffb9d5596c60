// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! txd: the control-plane daemon binary.
//!
//! Owns the long-running side of the system: the Scheduler reducer
//! (C7), the stale-engine sweeper (C4), the realtime session health
//! loop (C9), and the webhook dispatch poller (C10), each as an
//! independent tokio task joined on shutdown. The [`ipc`] module
//! exposes an admin Unix-socket listener answering [`tx_wire::AdminQuery`]
//! for the `txctl` CLI (spec §6 "CLI surface (control plane admin)").

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod daemon;
pub mod env;
pub mod ipc;
pub mod state;

pub use config::Config;
pub use daemon::Daemon;
pub use state::AppState;
