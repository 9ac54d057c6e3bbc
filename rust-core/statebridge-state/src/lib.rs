// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// statebridge State Store Contract
//
// This crate defines the contract every state store component implements.
// Backends (in-memory here, DynamoDB in `statebridge-dynamodb`) translate the
// generic Get/Set/Delete/BulkSet/BulkDelete requests into calls on their own
// client, so applications and the conformance runner can swap them freely.
//
// # Modules
//
// - [`store`] -- The `StateStore` trait.
// - [`request`] -- Request/response types, options and features.
// - [`metadata`] -- Component metadata (case-insensitive properties).
// - [`error`] -- The `StateError` enum.
// - [`memory`] -- An in-memory store with etag support.
// - [`metrics`] -- A transparent wrapper that collects operation statistics.
// - [`typed`] -- A serde-based wrapper with key prefixing.
//
// # Example
//
// ```rust
// use statebridge_state::{GetRequest, InMemoryStateStore, MetricsStore, SetRequest, StateStore};
//
// # tokio_test::block_on(async {
// let store = MetricsStore::new(InMemoryStateStore::new());
// store.set(&SetRequest::new("order-1", "pending")).await.unwrap();
//
// let resp = store.get(&GetRequest::new("order-1")).await.unwrap();
// assert_eq!(resp.data.as_deref(), Some(&b"pending"[..]));
// # });
// ```

pub mod error;
pub mod memory;
pub mod metadata;
pub mod metrics;
pub mod request;
pub mod store;
pub mod typed;

pub use error::{StateError, StateResult};
pub use memory::InMemoryStateStore;
pub use metadata::Metadata;
pub use metrics::{MetricsStore, StoreStats};
pub use request::{
    validate_key, Concurrency, Consistency, DeleteRequest, DeleteStateOption, Feature,
    GetRequest, GetResponse, GetStateOption, SetRequest, SetStateOption,
};
pub use store::StateStore;
pub use typed::TypedStateStore;
