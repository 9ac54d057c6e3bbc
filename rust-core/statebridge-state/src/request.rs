// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Request and response types for the state store contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Read consistency requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    #[default]
    Eventual,
    Strong,
}

/// Write concurrency mode.
///
/// `FirstWrite` with no etag means "only write if the key does not exist".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Concurrency {
    #[default]
    LastWrite,
    FirstWrite,
}

/// Optional capabilities a state store may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Writes and deletes honour etags.
    ETag,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStateOption {
    pub consistency: Consistency,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStateOption {
    pub concurrency: Concurrency,
    pub consistency: Consistency,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStateOption {
    pub concurrency: Concurrency,
    pub consistency: Consistency,
}

/// Read a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub options: GetStateOption,
}

impl GetRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Request a strongly consistent read.
    pub fn strong(mut self) -> Self {
        self.options.consistency = Consistency::Strong;
        self
    }
}

/// Result of a [`GetRequest`].
///
/// `data` is `None` when the key does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    pub data: Option<Vec<u8>>,
    pub etag: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl GetResponse {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn is_found(&self) -> bool {
        self.data.is_some()
    }
}

/// Write a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Vec<u8>,
    pub etag: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub options: SetStateOption,
}

impl SetRequest {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Build a request whose value is the JSON encoding of `value`.
    pub fn json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self, StateError> {
        let key = key.into();
        let bytes = serde_json::to_vec(value).map_err(|err| {
            StateError::Serialization(format!("failed to serialize value for key '{}': {}", key, err))
        })?;
        Ok(Self::new(key, bytes))
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.options.concurrency = concurrency;
        self
    }
}

/// Delete a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub key: String,
    pub etag: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub options: DeleteStateOption,
}

impl DeleteRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// Reject empty keys; shared by every backend.
pub fn validate_key(key: &str) -> Result<(), StateError> {
    if key.is_empty() {
        return Err(StateError::InvalidRequest("key must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_json() {
        let req = SetRequest::json("k", &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(req.key, "k");
        assert_eq!(req.value, br#"{"a":1}"#.to_vec());
        assert_eq!(req.options.concurrency, Concurrency::LastWrite);
    }

    #[test]
    fn test_get_request_strong() {
        let req = GetRequest::new("k").strong();
        assert_eq!(req.options.consistency, Consistency::Strong);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("ok").is_ok());
        assert!(matches!(validate_key(""), Err(StateError::InvalidRequest(_))));
    }

    #[test]
    fn test_consistency_serde_names() {
        let v: Consistency = serde_json::from_str("\"strong\"").unwrap();
        assert_eq!(v, Consistency::Strong);
        let c: Concurrency = serde_json::from_str("\"first-write\"").unwrap();
        assert_eq!(c, Concurrency::FirstWrite);
    }
}
