// SPDX-License-Identifier: PMPL-1.0-or-later
//! statebridge Pub/Sub Contract
//!
//! The messaging counterpart of `statebridge-state`: a `PubSub` trait that
//! broker adapters implement, plus an in-process broker used by the
//! conformance runner and by tests.

pub mod memory;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::InMemoryPubSub;
pub use statebridge_state::Metadata;

/// Pub/sub errors
#[derive(Error, Debug)]
pub enum PubSubError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid metadata: {0}")]
    Metadata(#[from] statebridge_state::StateError),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("timed out after {0:?} waiting for a message")]
    Timeout(Duration),
}

/// Publish one message to a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub topic: String,
    pub data: Vec<u8>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PublishRequest {
    pub fn new(topic: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            data: data.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Subscribe to a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub topic: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl SubscribeRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            metadata: HashMap::new(),
        }
    }
}

/// A delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub data: Vec<u8>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// The receiving end of a subscription.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    rx: mpsc::Receiver<Message>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, rx: mpsc::Receiver<Message>) -> Self {
        Self {
            topic: topic.into(),
            rx,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message. `None` once the broker side has closed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Wait for the next message for at most `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>, PubSubError> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .map_err(|_| PubSubError::Timeout(timeout))
    }
}

/// A pluggable publish/subscribe component.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Configure the broker client from component metadata.
    async fn init(&mut self, metadata: Metadata) -> Result<(), PubSubError>;

    /// Publish a message. Publishing to a topic without subscribers succeeds.
    async fn publish(&self, req: &PublishRequest) -> Result<(), PubSubError>;

    /// Start receiving messages published to `req.topic` from now on.
    async fn subscribe(&self, req: SubscribeRequest) -> Result<Subscription, PubSubError>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<P: PubSub + ?Sized> PubSub for Box<P> {
    async fn init(&mut self, metadata: Metadata) -> Result<(), PubSubError> {
        (**self).init(metadata).await
    }

    async fn publish(&self, req: &PublishRequest) -> Result<(), PubSubError> {
        (**self).publish(req).await
    }

    async fn subscribe(&self, req: SubscribeRequest) -> Result<Subscription, PubSubError> {
        (**self).subscribe(req).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

pub(crate) fn validate_topic(topic: &str) -> Result<(), PubSubError> {
    if topic.is_empty() {
        return Err(PubSubError::InvalidRequest("topic must not be empty".to_string()));
    }
    Ok(())
}
