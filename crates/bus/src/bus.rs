//! The `Bus` trait: durable queues addressed by name.
//!
//! Delivery mode is a property of the queue *name*, not something callers
//! choose: the task-dispatch queue ([`crate::queue::TASK_CREATED`], which
//! also carries recovery dispatches per the wire contract) is a competing-
//! consumer work queue — each message goes to exactly one subscriber, so a
//! task is never picked up by two workers at once. The status/heartbeat/
//! checkpoint queues are fan-out: every subscriber sees every message, which
//! is what lets a worker that isn't the target of a migration directive see
//! it and ignore it, and what lets the coordinator and any number of
//! dashboard-adjacent consumers all observe the same status stream.
//!
//! A production deployment swaps [`crate::LocalBus`] for a networked broker
//! behind this same trait; the coordinator and worker runtime only ever see
//! `Bus`.

use crate::error::BusError;
use async_trait::async_trait;
use fabric_core::MessageEnvelope;

#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish `envelope` to `queue`.
    async fn publish(&self, queue: &str, envelope: &MessageEnvelope) -> Result<(), BusError>;

    /// Subscribe to `queue`. See the trait docs for which queues fan out and
    /// which are competing-consumer.
    async fn subscribe(&self, queue: &str) -> Subscription;
}

pub(crate) enum SubscriptionInner {
    Fanout(tokio::sync::broadcast::Receiver<Vec<u8>>),
    WorkQueue(std::sync::Arc<tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>>>),
}

/// A live subscription to one queue.
pub struct Subscription {
    pub(crate) queue: String,
    pub(crate) inner: SubscriptionInner,
}

impl Subscription {
    /// Wait for and decode the next message on this queue.
    pub async fn recv(&mut self) -> Result<MessageEnvelope, BusError> {
        match &mut self.inner {
            SubscriptionInner::Fanout(rx) => loop {
                match rx.recv().await {
                    Ok(bytes) => return Self::decode(&self.queue, &bytes),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        tracing::warn!(queue = %self.queue, "subscriber lagged, skipping missed messages");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return Err(BusError::Closed),
                }
            },
            SubscriptionInner::WorkQueue(shared) => {
                let mut receiver = shared.lock().await;
                match receiver.recv().await {
                    Some(bytes) => Self::decode(&self.queue, &bytes),
                    None => Err(BusError::Closed),
                }
            }
        }
    }

    fn decode(queue: &str, bytes: &[u8]) -> Result<MessageEnvelope, BusError> {
        serde_json::from_slice(bytes).map_err(|source| BusError::Decode { queue: queue.to_string(), source })
    }
}
