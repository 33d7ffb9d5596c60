// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
//! tx-storage: the three storage contracts the control plane is built
//! on (spec §6) plus in-memory reference adapters for tests.
//!
//! - [`kv`] — C1 Key-Value Coordinator: hashes, sets, leased FIFO
//!   queues, counters, pub/sub, TTL keys.
//! - [`ds`] — C2 Durable Store: transactional job/task/delivery/audit
//!   rows with secondary-index listing and skip-locked claims.
//! - [`os`] — C3 Object Store: content-addressed blobs with byte-range
//!   reads, multipart upload, and presigned GET URLs.
//!
//! None of the in-memory adapters in this crate are production
//! backends; they exist so every other crate's test suite can exercise
//! real trait implementations without a network dependency.

pub mod ds;
pub mod kv;
pub mod os;

pub use ds::{Cursor, DsError, DurableStore, InMemoryDs, Page};
pub use kv::{InMemoryKv, KvError, KvStore, LeasedItem};
pub use os::{InMemoryOs, ObjectMetadata, ObjectStore, OsError};
