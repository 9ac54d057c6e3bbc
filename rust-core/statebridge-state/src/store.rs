// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core state store trait.
//
// Every backend adapter (in-memory, DynamoDB, ...) implements `StateStore`
// by translating these generic key/value requests into calls on its own
// client. Stores are `Send + Sync` and fully asynchronous.

use async_trait::async_trait;

use crate::error::StateError;
use crate::metadata::Metadata;
use crate::request::{DeleteRequest, Feature, GetRequest, GetResponse, SetRequest};

/// A pluggable key/value state store component.
///
/// Keys are strings and values are opaque bytes. A missing key is never an
/// error: [`StateStore::get`] returns a [`GetResponse`] with `data == None`
/// and [`StateStore::delete`] succeeds.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Configure the store from component metadata and connect its client.
    async fn init(&mut self, metadata: Metadata) -> Result<(), StateError>;

    /// Optional capabilities supported by this store.
    fn features(&self) -> Vec<Feature> {
        Vec::new()
    }

    /// Read the value stored under `req.key`.
    async fn get(&self, req: &GetRequest) -> Result<GetResponse, StateError>;

    /// Write `req.value` under `req.key`, replacing any previous value.
    async fn set(&self, req: &SetRequest) -> Result<(), StateError>;

    /// Remove `req.key`.
    async fn delete(&self, req: &DeleteRequest) -> Result<(), StateError>;

    /// Write several keys.
    ///
    /// The default applies each request in order and stops at the first
    /// failure. Backends with a native batch call override this.
    async fn bulk_set(&self, reqs: &[SetRequest]) -> Result<(), StateError> {
        for req in reqs {
            self.set(req).await?;
        }
        Ok(())
    }

    /// Remove several keys. Same default semantics as [`StateStore::bulk_set`].
    async fn bulk_delete(&self, reqs: &[DeleteRequest]) -> Result<(), StateError> {
        for req in reqs {
            self.delete(req).await?;
        }
        Ok(())
    }

    /// Human-readable backend name, used in logs and conformance reports.
    fn name(&self) -> &str;
}

#[async_trait]
impl<S: StateStore + ?Sized> StateStore for Box<S> {
    async fn init(&mut self, metadata: Metadata) -> Result<(), StateError> {
        (**self).init(metadata).await
    }

    fn features(&self) -> Vec<Feature> {
        (**self).features()
    }

    async fn get(&self, req: &GetRequest) -> Result<GetResponse, StateError> {
        (**self).get(req).await
    }

    async fn set(&self, req: &SetRequest) -> Result<(), StateError> {
        (**self).set(req).await
    }

    async fn delete(&self, req: &DeleteRequest) -> Result<(), StateError> {
        (**self).delete(req).await
    }

    async fn bulk_set(&self, reqs: &[SetRequest]) -> Result<(), StateError> {
        (**self).bulk_set(reqs).await
    }

    async fn bulk_delete(&self, reqs: &[DeleteRequest]) -> Result<(), StateError> {
        (**self).bulk_delete(reqs).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
