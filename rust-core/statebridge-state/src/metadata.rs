// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Component metadata: the flat string properties a component is configured
// with at `init` time.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Configuration properties handed to a component's `init`.
///
/// Property names are matched case-insensitively, so `AccessKey`,
/// `accessKey` and `accesskey` all resolve to the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Raw property map as written in the component definition.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Metadata {
    /// Create metadata from an existing property map.
    pub fn new(properties: HashMap<String, String>) -> Self {
        Self { properties }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Look up a property, ignoring ASCII case. Exact matches win.
    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.properties.get(name) {
            return Some(value.as_str());
        }
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a property and treat an empty string as absent.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// Look up a required property.
    pub fn require(&self, name: &str) -> Result<&str, StateError> {
        self.get_non_empty(name)
            .ok_or_else(|| StateError::MissingMetadata(format!("missing metadata property '{}'", name)))
    }

    /// Parse an optional property, returning `default` when absent.
    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T, StateError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_non_empty(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| StateError::InvalidMetadata {
                property: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True if no properties are set.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl From<HashMap<String, String>> for Metadata {
    fn from(properties: HashMap<String, String>) -> Self {
        Self { properties }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
