// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed state wrapper.
//
// Serde-based access on top of any `StateStore`. Values are JSON encoded and
// every key is prefixed with `"{prefix}||"`, so several applications can share
// one physical store without key collisions.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StateError;
use crate::request::{DeleteRequest, GetRequest, SetRequest};
use crate::store::StateStore;

/// Separator between the key prefix and the logical key.
pub const KEY_SEPARATOR: &str = "||";

/// A typed wrapper around a [`StateStore`].
///
/// # Example
///
/// ```rust
/// use statebridge_state::{InMemoryStateStore, TypedStateStore};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Serialize, Deserialize, PartialEq)]
/// struct Order { id: u32, item: String }
///
/// # tokio_test::block_on(async {
/// let store = TypedStateStore::new(InMemoryStateStore::new(), "shop");
/// let order = Order { id: 7, item: "tea".into() };
/// store.save("order-7", &order).await.unwrap();
///
/// let loaded: Order = store.load("order-7").await.unwrap().unwrap();
/// assert_eq!(loaded, order);
/// # });
/// ```
pub struct TypedStateStore<S: StateStore> {
    store: S,
    prefix: String,
}

impl<S: StateStore> TypedStateStore<S> {
    pub fn new(store: S, prefix: &str) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The physical key a logical key is stored under.
    pub fn physical_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}{}", self.prefix, KEY_SEPARATOR, key)
        }
    }

    /// Load and deserialize a value. `Ok(None)` if the key does not exist.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        let resp = self.store.get(&GetRequest::new(self.physical_key(key))).await?;
        match resp.data {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|err| {
                    StateError::Serialization(format!(
                        "failed to deserialize value for key '{}': {}",
                        key, err
                    ))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize and store a value.
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StateError> {
        let req = SetRequest::json(self.physical_key(key), value)?;
        self.store.set(&req).await
    }

    /// Serialize and store several values with one bulk call.
    pub async fn save_all<T: Serialize>(&self, entries: &[(&str, T)]) -> Result<(), StateError> {
        let reqs = entries
            .iter()
            .map(|(key, value)| SetRequest::json(self.physical_key(key), value))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.bulk_set(&reqs).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StateError> {
        self.store
            .delete(&DeleteRequest::new(self.physical_key(key)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStateStore;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Profile {
        name: String,
        visits: u32,
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = TypedStateStore::new(InMemoryStateStore::new(), "app1");
        let p = Profile { name: "ada".into(), visits: 3 };
        store.save("ada", &p).await.unwrap();
        assert_eq!(store.load::<Profile>("ada").await.unwrap(), Some(p));
        assert_eq!(store.load::<Profile>("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_are_prefixed() {
        let raw = InMemoryStateStore::new();
        let store = TypedStateStore::new(raw.clone(), "app1");
        store.save("k", &1u32).await.unwrap();

        let resp = raw.get(&GetRequest::new("app1||k")).await.unwrap();
        assert_eq!(resp.data, Some(b"1".to_vec()));
        assert_eq!(store.physical_key("k"), "app1||k");
    }

    #[tokio::test]
    async fn test_empty_prefix_passes_key_through() {
        let store = TypedStateStore::new(InMemoryStateStore::new(), "");
        assert_eq!(store.physical_key("k"), "k");
    }

    #[tokio::test]
    async fn test_save_all_and_remove() {
        let store = TypedStateStore::new(InMemoryStateStore::new(), "bulk");
        store.save_all(&[("a", 1u32), ("b", 2u32)]).await.unwrap();
        assert_eq!(store.load::<u32>("b").await.unwrap(), Some(2));
        store.remove("a").await.unwrap();
        assert_eq!(store.load::<u32>("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_wrong_type_is_serialization_error() {
        let raw = InMemoryStateStore::new();
        raw.set(&SetRequest::new("x||k", "not json")).await.unwrap();
        let store = TypedStateStore::new(raw, "x");
        assert!(matches!(
            store.load::<u32>("k").await,
            Err(StateError::Serialization(_))
        ));
    }
}
