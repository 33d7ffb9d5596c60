// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory reference adapter for [`super::ObjectStore`]. Not a
//! production backend (spec §1 treats S3-or-similar as an external
//! collaborator); useful for exercising task pipelines end to end in
//! tests without real blob storage.

use super::{ObjectMetadata, ObjectStore, OsError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

struct MultipartUpload {
    key: String,
    content_type: String,
    parts: BTreeMap<u32, Vec<u8>>,
}

#[derive(Clone, Default)]
pub struct InMemoryOs {
    objects: Arc<DashMap<String, StoredObject>>,
    uploads: Arc<DashMap<String, MultipartUpload>>,
    upload_seq: Arc<AtomicU64>,
}

impl InMemoryOs {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryOs {
    async fn put_object(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<ObjectMetadata, OsError> {
        let size_bytes = bytes.len() as u64;
        self.objects.insert(key.to_string(), StoredObject { content_type: content_type.to_string(), bytes });
        Ok(ObjectMetadata { key: key.to_string(), size_bytes, content_type: content_type.to_string() })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, OsError> {
        self.objects.get(key).map(|o| o.bytes.clone()).ok_or_else(|| OsError::NotFound(key.to_string()))
    }

    async fn get_object_range(&self, key: &str, range: Range<u64>) -> Result<Vec<u8>, OsError> {
        let object = self.objects.get(key).ok_or_else(|| OsError::NotFound(key.to_string()))?;
        let len = object.bytes.len() as u64;
        if range.start > len || range.end > len || range.start > range.end {
            return Err(OsError::RangeOutOfBounds(range, key.to_string()));
        }
        Ok(object.bytes[range.start as usize..range.end as usize].to_vec())
    }

    async fn head_object(&self, key: &str) -> Result<Option<ObjectMetadata>, OsError> {
        Ok(self.objects.get(key).map(|o| ObjectMetadata {
            key: key.to_string(),
            size_bytes: o.bytes.len() as u64,
            content_type: o.content_type.clone(),
        }))
    }

    async fn delete_object(&self, key: &str) -> Result<(), OsError> {
        self.objects.remove(key);
        Ok(())
    }

    async fn create_multipart_upload(&self, key: &str, content_type: &str) -> Result<String, OsError> {
        let id = format!("upload-{}", self.upload_seq.fetch_add(1, Ordering::Relaxed) + 1);
        self.uploads.insert(
            id.clone(),
            MultipartUpload { key: key.to_string(), content_type: content_type.to_string(), parts: BTreeMap::new() },
        );
        Ok(id)
    }

    async fn upload_part(&self, upload_id: &str, part_number: u32, bytes: Vec<u8>) -> Result<(), OsError> {
        let mut upload =
            self.uploads.get_mut(upload_id).ok_or_else(|| OsError::NotFound(upload_id.to_string()))?;
        upload.parts.insert(part_number, bytes);
        Ok(())
    }

    async fn complete_multipart_upload(&self, upload_id: &str) -> Result<ObjectMetadata, OsError> {
        let (_, upload) =
            self.uploads.remove(upload_id).ok_or_else(|| OsError::NotFound(upload_id.to_string()))?;
        if upload.parts.is_empty() {
            return Err(OsError::EmptyMultipart(upload_id.to_string()));
        }
        let mut bytes = Vec::new();
        for (_, part) in upload.parts {
            bytes.extend(part);
        }
        self.put_object(&upload.key, &upload.content_type, bytes).await
    }

    async fn abort_multipart_upload(&self, upload_id: &str) -> Result<(), OsError> {
        self.uploads.remove(upload_id);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in_secs: u64) -> Result<String, OsError> {
        if !self.objects.contains_key(key) {
            return Err(OsError::NotFound(key.to_string()));
        }
        Ok(format!("mem://presigned/{key}?expires_in={expires_in_secs}"))
    }
}
