// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for state stores.
//
// Wraps any `StateStore` and transparently collects operation counts,
// failure counts, latency sums, and byte transfer totals. The conformance
// runner wraps every component under test with it and prints the totals.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::StateError;
use crate::metadata::Metadata;
use crate::request::{DeleteRequest, Feature, GetRequest, GetResponse, SetRequest};
use crate::store::StateStore;

/// Accumulated statistics for a state store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    /// Number of `get` operations performed.
    pub get_count: u64,
    /// Number of keys written, counting each item of a bulk set.
    pub set_count: u64,
    /// Number of keys deleted, counting each item of a bulk delete.
    pub delete_count: u64,
    /// Number of `bulk_set` and `bulk_delete` calls.
    pub bulk_count: u64,
    /// Number of calls that returned an error.
    pub error_count: u64,
    /// Cumulative wall-clock latency of all `get` calls, in milliseconds.
    pub get_latency_sum_ms: f64,
    /// Cumulative wall-clock latency of all write calls, in milliseconds.
    pub set_latency_sum_ms: f64,
    /// Total bytes returned by `get`.
    pub total_bytes_read: u64,
    /// Total bytes written by `set` and `bulk_set`.
    pub total_bytes_written: u64,
}

/// A state store wrapper that collects operation metrics.
///
/// # Example
///
/// ```rust
/// use statebridge_state::{InMemoryStateStore, MetricsStore, StateStore, GetRequest, SetRequest};
///
/// # tokio_test::block_on(async {
/// let metered = MetricsStore::new(InMemoryStateStore::new());
///
/// metered.set(&SetRequest::new("key", "value")).await.unwrap();
/// metered.get(&GetRequest::new("key")).await.unwrap();
///
/// let stats = metered.stats().await;
/// assert_eq!(stats.set_count, 1);
/// assert_eq!(stats.get_count, 1);
/// # });
/// ```
pub struct MetricsStore<S: StateStore> {
    inner: S,
    stats: Arc<RwLock<StoreStats>>,
}

impl<S: StateStore> MetricsStore<S> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    /// Snapshot of the current statistics.
    pub async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }

    /// Reset all statistics to zero.
    pub async fn reset_stats(&self) {
        let mut s = self.stats.write().await;
        *s = StoreStats::default();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: StateStore> StateStore for MetricsStore<S> {
    async fn init(&mut self, metadata: Metadata) -> Result<(), StateError> {
        self.inner.init(metadata).await
    }

    fn features(&self) -> Vec<Feature> {
        self.inner.features()
    }

    async fn get(&self, req: &GetRequest) -> Result<GetResponse, StateError> {
        let start = Instant::now();
        let result = self.inner.get(req).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.write().await;
        s.get_count += 1;
        s.get_latency_sum_ms += elapsed_ms;
        match result {
            Ok(ref resp) => {
                s.total_bytes_read += resp.data.as_ref().map_or(0, |d| d.len() as u64);
            }
            Err(_) => s.error_count += 1,
        }

        result
    }

    async fn set(&self, req: &SetRequest) -> Result<(), StateError> {
        let start = Instant::now();
        let result = self.inner.set(req).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.write().await;
        s.set_count += 1;
        s.set_latency_sum_ms += elapsed_ms;
        if result.is_ok() {
            s.total_bytes_written += req.value.len() as u64;
        } else {
            s.error_count += 1;
        }

        result
    }

    async fn delete(&self, req: &DeleteRequest) -> Result<(), StateError> {
        let result = self.inner.delete(req).await;

        let mut s = self.stats.write().await;
        s.delete_count += 1;
        if result.is_err() {
            s.error_count += 1;
        }

        result
    }

    async fn bulk_set(&self, reqs: &[SetRequest]) -> Result<(), StateError> {
        let start = Instant::now();
        let result = self.inner.bulk_set(reqs).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.write().await;
        s.bulk_count += 1;
        s.set_count += reqs.len() as u64;
        s.set_latency_sum_ms += elapsed_ms;
        if result.is_ok() {
            s.total_bytes_written += reqs.iter().map(|r| r.value.len() as u64).sum::<u64>();
        } else {
            s.error_count += 1;
        }

        result
    }

    async fn bulk_delete(&self, reqs: &[DeleteRequest]) -> Result<(), StateError> {
        let result = self.inner.bulk_delete(reqs).await;

        let mut s = self.stats.write().await;
        s.bulk_count += 1;
        s.delete_count += reqs.len() as u64;
        if result.is_err() {
            s.error_count += 1;
        }

        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
