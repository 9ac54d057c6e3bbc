// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Component registry: maps the names used in test plans to constructors.

use std::collections::HashMap;
use std::sync::Arc;

use statebridge_pubsub::{InMemoryPubSub, PubSub};
use statebridge_state::{InMemoryStateStore, StateStore};

use crate::error::ConformanceError;

pub type StateFactory = Arc<dyn Fn() -> Box<dyn StateStore> + Send + Sync>;
pub type PubSubFactory = Arc<dyn Fn() -> Box<dyn PubSub> + Send + Sync>;

/// Named constructors for every component the runner can instantiate.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    state: HashMap<String, StateFactory>,
    pubsub: HashMap<String, PubSubFactory>,
}

impl ComponentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every component built into this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_state("in-memory", || Box::new(InMemoryStateStore::new()));
        registry.register_pubsub("in-memory", || Box::new(InMemoryPubSub::new()));

        #[cfg(feature = "dynamodb")]
        {
            use statebridge_dynamodb::DynamoDbStateStore;
            registry.register_state("aws.dynamodb", || Box::new(DynamoDbStateStore::new()));
            registry.register_state("dynamodb", || Box::new(DynamoDbStateStore::new()));
        }

        registry
    }

    pub fn register_state<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn StateStore> + Send + Sync + 'static,
    {
        self.state.insert(name.into(), Arc::new(factory));
    }

    pub fn register_pubsub<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn PubSub> + Send + Sync + 'static,
    {
        self.pubsub.insert(name.into(), Arc::new(factory));
    }

    /// Construct a fresh, uninitialized state store.
    pub fn create_state(&self, name: &str) -> Result<Box<dyn StateStore>, ConformanceError> {
        self.state
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ConformanceError::UnknownComponent {
                kind: "state",
                name: name.to_string(),
            })
    }

    /// Construct a fresh, uninitialized pub/sub component.
    pub fn create_pubsub(&self, name: &str) -> Result<Box<dyn PubSub>, ConformanceError> {
        self.pubsub
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ConformanceError::UnknownComponent {
                kind: "pubsub",
                name: name.to_string(),
            })
    }

    /// Registered state component names, sorted.
    pub fn state_components(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.state.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered pub/sub component names, sorted.
    pub fn pubsub_components(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pubsub.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("state", &self.state_components())
            .field("pubsub", &self.pubsub_components())
            .finish()
    }
}
