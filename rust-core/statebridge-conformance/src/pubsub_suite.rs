// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in behavioural suite for pub/sub components.
//
// Subscribes to `{topic}-{run id}`, publishes `messageCount` numbered
// messages and expects every one of them back, in order, within
// `maxReadDurationInMs`. A single publish that takes longer than that
// window fails the `publish` case.

use std::time::{Duration, Instant};

use statebridge_pubsub::{PubSub, PublishRequest, SubscribeRequest, Subscription};
use tracing::info;

use crate::config::{ComponentConfig, Operation};
use crate::report::ComponentReport;
use crate::state_suite::timed;

fn payload(run_id: &str, i: usize) -> Vec<u8> {
    format!("message {} of run {}", i, run_id).into_bytes()
}

/// Publish `count` numbered messages, giving each publish at most
/// `per_message` before reporting it as stuck.
async fn publish_all(
    broker: &dyn PubSub,
    topic: &str,
    run_id: &str,
    count: usize,
    per_message: Duration,
) -> (Result<(), String>, Duration) {
    let start = Instant::now();
    for i in 0..count {
        let req = PublishRequest::new(topic, payload(run_id, i));
        match tokio::time::timeout(per_message, broker.publish(&req)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return (Err(format!("message {}: {}", i, err)), start.elapsed()),
            Err(_) => {
                return (
                    Err(format!("message {}: timed out after {}ms", i, per_message.as_millis())),
                    start.elapsed(),
                )
            }
        }
    }
    (Ok(()), start.elapsed())
}

/// Expect `count` numbered messages, in order, within `window`.
async fn receive_all(
    mut sub: Subscription,
    run_id: &str,
    count: usize,
    window: Duration,
) -> (Result<(), String>, Duration) {
    let start = Instant::now();
    let deadline = start + window;
    for i in 0..count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let failure = match sub.recv_timeout(remaining).await {
            Ok(Some(msg)) if msg.data == payload(run_id, i) => continue,
            Ok(Some(msg)) => format!(
                "message {} out of order: got {:?}",
                i,
                String::from_utf8_lossy(&msg.data)
            ),
            Ok(None) => format!("subscription closed after {} message(s)", i),
            Err(_) => format!(
                "received {} of {} message(s) within {}ms",
                i,
                count,
                window.as_millis()
            ),
        };
        return (Err(failure), start.elapsed());
    }
    (Ok(()), start.elapsed())
}

/// Run every enabled pub/sub operation against an initialized broker.
///
/// When subscribed, the subscription is drained while publishing so a
/// broker with bounded queues never blocks the publisher.
pub async fn run_pubsub_suite(
    broker: &dyn PubSub,
    component: &ComponentConfig,
    run_id: &str,
    report: &mut ComponentReport,
) {
    let cfg = &component.config;
    let topic = format!("{}-{}", cfg.topic, run_id);
    let window = Duration::from_millis(cfg.max_read_duration_in_ms);
    info!(component = %component.component, %topic, "running pubsub suite");

    let mut subscription: Option<Subscription> = None;
    if component.enabled(Operation::Subscribe) {
        let (result, elapsed) = timed(broker.subscribe(SubscribeRequest::new(topic.clone()))).await;
        match result {
            Ok(sub) => {
                report.pass("subscribe", elapsed);
                subscription = Some(sub);
            }
            Err(err) => report.fail("subscribe", err.to_string(), elapsed),
        }
    }

    if !component.enabled(Operation::Publish) {
        return;
    }

    let publishing = publish_all(broker, &topic, run_id, cfg.message_count, window);
    let (published, received) = match subscription {
        Some(sub) => {
            let (published, received) =
                tokio::join!(publishing, receive_all(sub, run_id, cfg.message_count, window));
            (published, Some(received))
        }
        None => (publishing.await, None),
    };

    match published {
        (Ok(()), elapsed) => {
            report.check_duration("publish", elapsed, cfg.max_publish_duration_in_ms);
        }
        (Err(message), elapsed) => report.fail("publish", message, elapsed),
    }
    match received {
        Some((Ok(()), elapsed)) => report.pass("receive", elapsed),
        Some((Err(message), elapsed)) => report.fail("receive", message, elapsed),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::report::Outcome;
    use statebridge_pubsub::{InMemoryPubSub, Metadata, PubSubError};
    use std::collections::HashMap;

    fn component(all: bool, ops: &[Operation]) -> ComponentConfig {
        ComponentConfig {
            component: "in-memory".to_string(),
            all_operations: all,
            operations: ops.to_vec(),
            metadata: HashMap::new(),
            config: SuiteConfig {
                message_count: 5,
                max_read_duration_in_ms: 500,
                ..Default::default()
            },
            steps: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_broker_passes() {
        let broker = InMemoryPubSub::new();
        let mut report = ComponentReport::new("in-memory");
        run_pubsub_suite(&broker, &component(true, &[]), "r1", &mut report).await;

        let cases: Vec<&str> = report.cases.iter().map(|c| c.case.as_str()).collect();
        assert_eq!(cases, vec!["subscribe", "publish", "receive"]);
        assert!(report.cases.iter().all(|c| c.outcome == Outcome::Passed));
    }

    #[tokio::test]
    async fn test_publish_only_has_no_receive_case() {
        let broker = InMemoryPubSub::new();
        let mut report = ComponentReport::new("in-memory");
        run_pubsub_suite(&broker, &component(false, &[Operation::Publish]), "r2", &mut report).await;
        assert_eq!(report.cases.len(), 1);
        assert_eq!(report.cases[0].case, "publish");
    }

    /// Accepts publishes but never delivers them.
    struct BlackHole;

    #[async_trait::async_trait]
    impl PubSub for BlackHole {
        async fn init(&mut self, _: Metadata) -> Result<(), PubSubError> {
            Ok(())
        }
        async fn publish(&self, _: &PublishRequest) -> Result<(), PubSubError> {
            Ok(())
        }
        async fn subscribe(&self, req: SubscribeRequest) -> Result<Subscription, PubSubError> {
            let (tx, rx) = tokio::sync::mpsc::channel(1);
            // Keep the channel open so the receiver times out instead of closing.
            std::mem::forget(tx);
            Ok(Subscription::new(req.topic, rx))
        }
        fn name(&self) -> &str {
            "black-hole"
        }
    }

    #[tokio::test]
    async fn test_undelivered_messages_fail_receive() {
        let mut comp = component(true, &[]);
        comp.config.max_read_duration_in_ms = 20;
        let mut report = ComponentReport::new("black-hole");
        run_pubsub_suite(&BlackHole, &comp, "r3", &mut report).await;

        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].case, "receive");
        assert!(failed[0].message.contains("received 0 of 5"));
    }

    #[tokio::test]
    async fn test_more_messages_than_buffer_does_not_block() {
        let mut broker = InMemoryPubSub::new();
        broker
            .init(Metadata::default().with("bufferSize", "4"))
            .await
            .unwrap();
        let mut comp = component(true, &[]);
        comp.config.message_count = 10;
        let mut report = ComponentReport::new("in-memory");

        tokio::time::timeout(
            Duration::from_secs(5),
            run_pubsub_suite(&broker, &comp, "r4", &mut report),
        )
        .await
        .expect("suite finished");
        assert!(report.cases.iter().all(|c| c.outcome == Outcome::Passed));
        assert_eq!(report.cases.len(), 3);
    }

    /// Delivers nothing and takes `delay` per publish; `None` never returns.
    struct SlowBroker {
        delay: Option<Duration>,
    }

    #[async_trait::async_trait]
    impl PubSub for SlowBroker {
        async fn init(&mut self, _: Metadata) -> Result<(), PubSubError> {
            Ok(())
        }
        async fn publish(&self, _: &PublishRequest) -> Result<(), PubSubError> {
            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => std::future::pending::<()>().await,
            }
            Ok(())
        }
        async fn subscribe(&self, _: SubscribeRequest) -> Result<Subscription, PubSubError> {
            unreachable!("publish-only tests")
        }
        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_publish_over_limit_fails() {
        let broker = SlowBroker {
            delay: Some(Duration::from_millis(20)),
        };
        let mut comp = component(false, &[Operation::Publish]);
        comp.config.message_count = 2;
        comp.config.max_publish_duration_in_ms = Some(5);
        let mut report = ComponentReport::new("slow");
        run_pubsub_suite(&broker, &comp, "r5", &mut report).await;

        assert_eq!(report.cases.len(), 1);
        assert_eq!(report.cases[0].outcome, Outcome::Failed);
        assert!(report.cases[0].message.contains("limit is 5ms"));
    }

    #[tokio::test]
    async fn test_stuck_publish_times_out() {
        let broker = SlowBroker { delay: None };
        let mut comp = component(false, &[Operation::Publish]);
        comp.config.max_read_duration_in_ms = 20;
        let mut report = ComponentReport::new("slow");
        run_pubsub_suite(&broker, &comp, "r6", &mut report).await;

        assert_eq!(report.cases[0].outcome, Outcome::Failed);
        assert_eq!(report.cases[0].message, "message 0: timed out after 20ms");
    }
}
