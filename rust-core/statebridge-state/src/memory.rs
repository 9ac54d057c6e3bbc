// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory state store.
//
// Uses a `BTreeMap` wrapped in a tokio `RwLock`. Every write bumps a
// per-key version which is exposed as the etag, so this store is also the
// reference implementation for optimistic concurrency in conformance runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StateError;
use crate::metadata::Metadata;
use crate::request::{
    validate_key, Concurrency, DeleteRequest, Feature, GetRequest, GetResponse, SetRequest,
};
use crate::store::StateStore;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    version: u64,
}

/// An in-memory state store with etag support.
///
/// All data lives in process memory and is lost on drop. Clones share the
/// same underlying map.
///
/// # Example
///
/// ```rust
/// use statebridge_state::{InMemoryStateStore, StateStore, GetRequest, SetRequest};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStateStore::new();
/// store.set(&SetRequest::new("hello", "world")).await.unwrap();
/// let resp = store.get(&GetRequest::new("hello")).await.unwrap();
/// assert_eq!(resp.data, Some(b"world".to_vec()));
/// assert_eq!(resp.etag.as_deref(), Some("1"));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    data: Arc<RwLock<BTreeMap<String, Entry>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

/// Check a write or delete against the current entry for its key.
fn check_etag(
    key: &str,
    current: Option<&Entry>,
    etag: Option<&str>,
    concurrency: Concurrency,
) -> Result<(), StateError> {
    match (etag, current) {
        (Some(etag), Some(entry)) if etag == entry.version.to_string() => Ok(()),
        (Some(_), _) => Err(StateError::EtagMismatch { key: key.to_string() }),
        (None, Some(_)) if concurrency == Concurrency::FirstWrite => {
            Err(StateError::EtagMismatch { key: key.to_string() })
        }
        (None, _) => Ok(()),
    }
}

fn apply_set(map: &mut BTreeMap<String, Entry>, req: &SetRequest) {
    let version = map.get(&req.key).map(|e| e.version + 1).unwrap_or(1);
    map.insert(
        req.key.clone(),
        Entry {
            value: req.value.clone(),
            version,
        },
    );
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn init(&mut self, metadata: Metadata) -> Result<(), StateError> {
        debug!(properties = metadata.len(), "initialized in-memory state store");
        Ok(())
    }

    fn features(&self) -> Vec<Feature> {
        vec![Feature::ETag]
    }

    async fn get(&self, req: &GetRequest) -> Result<GetResponse, StateError> {
        validate_key(&req.key)?;
        let map = self.data.read().await;
        Ok(match map.get(&req.key) {
            Some(entry) => GetResponse {
                data: Some(entry.value.clone()),
                etag: Some(entry.version.to_string()),
                metadata: Default::default(),
            },
            None => GetResponse::not_found(),
        })
    }

    async fn set(&self, req: &SetRequest) -> Result<(), StateError> {
        validate_key(&req.key)?;
        let mut map = self.data.write().await;
        check_etag(
            &req.key,
            map.get(&req.key),
            req.etag.as_deref(),
            req.options.concurrency,
        )?;
        apply_set(&mut map, req);
        Ok(())
    }

    async fn delete(&self, req: &DeleteRequest) -> Result<(), StateError> {
        validate_key(&req.key)?;
        let mut map = self.data.write().await;
        if req.etag.is_some() {
            check_etag(&req.key, map.get(&req.key), req.etag.as_deref(), req.options.concurrency)?;
        }
        map.remove(&req.key);
        Ok(())
    }

    async fn bulk_set(&self, reqs: &[SetRequest]) -> Result<(), StateError> {
        let mut map = self.data.write().await;
        // Apply to a staged copy so each request sees the ones before it and
        // a failure leaves the map untouched.
        let mut staged = map.clone();
        for req in reqs {
            validate_key(&req.key)?;
            check_etag(
                &req.key,
                staged.get(&req.key),
                req.etag.as_deref(),
                req.options.concurrency,
            )?;
            apply_set(&mut staged, req);
        }
        *map = staged;
        Ok(())
    }

    async fn bulk_delete(&self, reqs: &[DeleteRequest]) -> Result<(), StateError> {
        let mut map = self.data.write().await;
        let mut staged = map.clone();
        for req in reqs {
            validate_key(&req.key)?;
            if req.etag.is_some() {
                check_etag(&req.key, staged.get(&req.key), req.etag.as_deref(), req.options.concurrency)?;
            }
            staged.remove(&req.key);
        }
        *map = staged;
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
