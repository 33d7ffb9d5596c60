// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C3 Object Store contract (spec §6).
//!
//! Content-addressed object storage for input audio, intermediate
//! artifacts (transcripts, diarization turns, redacted audio), and
//! final outputs. Byte-range reads let an engine stream a large input
//! without buffering the whole object; presigned GET URLs let a
//! webhook consumer or the admin CLI fetch an artifact directly without
//! proxying bytes through the control plane.

use async_trait::async_trait;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OsError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("requested range {0:?} is out of bounds for object {1}")]
    RangeOutOfBounds(Range<u64>, String),
    #[error("multipart upload {0} has no parts")]
    EmptyMultipart(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size_bytes: u64,
    pub content_type: String,
}

/// Contract for the object store (spec §6 "C3 (OS)").
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<ObjectMetadata, OsError>;
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, OsError>;
    /// Reads `range` bytes of `key`. `range.end` is exclusive and clamped
    /// to the object's actual size by callers that don't know it ahead
    /// of time; an end past the object's length is an error here.
    async fn get_object_range(&self, key: &str, range: Range<u64>) -> Result<Vec<u8>, OsError>;
    async fn head_object(&self, key: &str) -> Result<Option<ObjectMetadata>, OsError>;
    async fn delete_object(&self, key: &str) -> Result<(), OsError>;

    /// Begins a multipart upload, returning an opaque upload id.
    async fn create_multipart_upload(&self, key: &str, content_type: &str) -> Result<String, OsError>;
    async fn upload_part(&self, upload_id: &str, part_number: u32, bytes: Vec<u8>) -> Result<(), OsError>;
    async fn complete_multipart_upload(&self, upload_id: &str) -> Result<ObjectMetadata, OsError>;
    async fn abort_multipart_upload(&self, upload_id: &str) -> Result<(), OsError>;

    /// Produces a time-limited URL a third party (e.g. a webhook
    /// consumer) can use to GET the object directly. The in-memory
    /// adapter returns a stub URL that is not actually fetchable.
    async fn presign_get(&self, key: &str, expires_in_secs: u64) -> Result<String, OsError>;
}

pub mod memory;
pub use memory::InMemoryOs;

#[cfg(test)]
#[path = "os_tests.rs"]
mod tests;
