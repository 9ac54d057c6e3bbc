// SPDX-License-Identifier: PMPL-1.0-or-later
//
// In-process pub/sub broker.
//
// Keeps one list of bounded mpsc senders per topic. Publishing fans the
// message out to every live subscriber; senders whose receiver has been
// dropped are pruned on the next publish.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::{
    validate_topic, Message, Metadata, PubSub, PubSubError, PublishRequest, SubscribeRequest,
    Subscription,
};

/// Default per-subscriber queue depth.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// An in-memory broker.
///
/// # Example
///
/// ```rust
/// use statebridge_pubsub::{InMemoryPubSub, PubSub, PublishRequest, SubscribeRequest};
///
/// # tokio_test::block_on(async {
/// let broker = InMemoryPubSub::new();
/// let mut sub = broker.subscribe(SubscribeRequest::new("orders")).await.unwrap();
/// broker.publish(&PublishRequest::new("orders", "created")).await.unwrap();
///
/// let msg = sub.recv().await.unwrap();
/// assert_eq!(msg.data, b"created".to_vec());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryPubSub {
    topics: Arc<RwLock<HashMap<String, Vec<mpsc::Sender<Message>>>>>,
    buffer_size: usize,
}

impl InMemoryPubSub {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Number of live subscribers on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map_or(0, |subs| subs.iter().filter(|s| !s.is_closed()).count())
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn init(&mut self, metadata: Metadata) -> Result<(), PubSubError> {
        let buffer_size = metadata.parse_or("bufferSize", DEFAULT_BUFFER_SIZE)?;
        if buffer_size == 0 {
            return Err(PubSubError::InvalidRequest(
                "bufferSize must be greater than zero".to_string(),
            ));
        }
        self.buffer_size = buffer_size;
        debug!(buffer_size = self.buffer_size, "initialized in-memory pubsub");
        Ok(())
    }

    async fn publish(&self, req: &PublishRequest) -> Result<(), PubSubError> {
        validate_topic(&req.topic)?;

        // Clone the senders so the lock is not held across awaits.
        let senders: Vec<mpsc::Sender<Message>> = {
            let mut topics = self.topics.write().await;
            match topics.get_mut(&req.topic) {
                Some(subs) => {
                    subs.retain(|s| !s.is_closed());
                    subs.clone()
                }
                None => Vec::new(),
            }
        };

        debug!(topic = %req.topic, subscribers = senders.len(), bytes = req.data.len(), "publish");

        for sender in senders {
            let msg = Message {
                topic: req.topic.clone(),
                data: req.data.clone(),
                metadata: req.metadata.clone(),
            };
            // A subscriber dropping mid-publish is not a publish failure.
            if sender.send(msg).await.is_err() {
                debug!(topic = %req.topic, "subscriber went away during publish");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, req: SubscribeRequest) -> Result<Subscription, PubSubError> {
        validate_topic(&req.topic)?;
        let (tx, rx) = mpsc::channel(self.buffer_size);
        self.topics
            .write()
            .await
            .entry(req.topic.clone())
            .or_default()
            .push(tx);
        debug!(topic = %req.topic, "subscribed");
        Ok(Subscription::new(req.topic, rx))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let broker = InMemoryPubSub::new();
        let mut a = broker.subscribe(SubscribeRequest::new("t")).await.unwrap();
        let mut b = broker.subscribe(SubscribeRequest::new("t")).await.unwrap();

        broker.publish(&PublishRequest::new("t", "hi")).await.unwrap();

        assert_eq!(a.recv().await.unwrap().data, b"hi".to_vec());
        assert_eq!(b.recv().await.unwrap().data, b"hi".to_vec());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let broker = InMemoryPubSub::new();
        broker.publish(&PublishRequest::new("nobody", "x")).await.unwrap();
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let broker = InMemoryPubSub::new();
        let mut sub = broker.subscribe(SubscribeRequest::new("a")).await.unwrap();
        broker.publish(&PublishRequest::new("b", "x")).await.unwrap();
        assert!(sub.recv_timeout(Duration::from_millis(20)).await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let broker = InMemoryPubSub::new();
        let sub = broker.subscribe(SubscribeRequest::new("t")).await.unwrap();
        assert_eq!(broker.subscriber_count("t").await, 1);
        drop(sub);
        broker.publish(&PublishRequest::new("t", "x")).await.unwrap();
        assert_eq!(broker.subscriber_count("t").await, 0);
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let broker = InMemoryPubSub::new();
        let mut sub = broker.subscribe(SubscribeRequest::new("seq")).await.unwrap();
        for i in 0..5 {
            broker
                .publish(&PublishRequest::new("seq", i.to_string()))
                .await
                .unwrap();
        }
        for i in 0..5 {
            assert_eq!(sub.recv().await.unwrap().data, i.to_string().into_bytes());
        }
    }

    #[tokio::test]
    async fn test_init_reads_buffer_size() {
        let mut broker = InMemoryPubSub::new();
        broker
            .init(Metadata::default().with("bufferSize", "8"))
            .await
            .unwrap();
        assert_eq!(broker.buffer_size, 8);

        let err = broker
            .init(Metadata::default().with("bufferSize", "0"))
            .await
            .unwrap_err();
        assert!(matches!(err, PubSubError::InvalidRequest(_)));
        assert_eq!(broker.buffer_size, 8);

        let err = broker
            .init(Metadata::default().with("bufferSize", "lots"))
            .await
            .unwrap_err();
        assert!(matches!(err, PubSubError::Metadata(_)));
        assert_eq!(broker.buffer_size, 8);
    }

    #[tokio::test]
    async fn test_subscribe_after_rejected_init() {
        let mut broker = InMemoryPubSub::new();
        assert!(broker
            .init(Metadata::default().with("bufferSize", "0"))
            .await
            .is_err());
        let mut sub = broker.subscribe(SubscribeRequest::new("t")).await.unwrap();
        broker.publish(&PublishRequest::new("t", "x")).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().data, b"x".to_vec());
    }

    #[tokio::test]
    async fn test_empty_topic_rejected() {
        let broker = InMemoryPubSub::new();
        assert!(broker.subscribe(SubscribeRequest::new("")).await.is_err());
        assert!(broker.publish(&PublishRequest::new("", "x")).await.is_err());
    }
}
