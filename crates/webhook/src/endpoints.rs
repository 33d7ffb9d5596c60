// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint registration lookup.
//!
//! spec §4.6 says signing is "per-endpoint HMAC... with a secret shown
//! once at endpoint creation", but endpoint registration itself is
//! gateway territory (spec §1 excludes request handling). This trait is
//! the narrow seam the dispatcher needs: given an [`EndpointId`], resolve
//! the URL to POST to and the secret to sign with. The in-memory
//! implementation is a reference/test adapter, not a production store.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tx_wire::EndpointId;

#[derive(Debug, Clone)]
pub struct EndpointRecord {
    pub url: String,
    pub secret: String,
}

pub trait EndpointRegistry: Send + Sync {
    fn lookup(&self, endpoint_id: &EndpointId) -> Option<EndpointRecord>;
}

#[derive(Clone, Default)]
pub struct InMemoryEndpointRegistry {
    endpoints: Arc<DashMap<EndpointId, EndpointRecord>>,
}

impl InMemoryEndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: HashMap<EndpointId, EndpointRecord>) -> Self {
        let endpoints = Arc::new(DashMap::new());
        for (id, record) in records {
            endpoints.insert(id, record);
        }
        Self { endpoints }
    }

    pub fn register(&self, endpoint_id: EndpointId, url: impl Into<String>, secret: impl Into<String>) {
        self.endpoints.insert(endpoint_id, EndpointRecord { url: url.into(), secret: secret.into() });
    }
}

impl EndpointRegistry for InMemoryEndpointRegistry {
    fn lookup(&self, endpoint_id: &EndpointId) -> Option<EndpointRecord> {
        self.endpoints.get(endpoint_id).map(|e| e.clone())
    }
}
