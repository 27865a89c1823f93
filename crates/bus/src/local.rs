//! In-memory reference implementation of [`Bus`].

use crate::bus::{Bus, Subscription, SubscriptionInner};
use crate::error::BusError;
use async_trait::async_trait;
use fabric_core::MessageEnvelope;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Queue names delivered competing-consumer: exactly one subscriber receives
/// each message. Everything else is fan-out. See [`Bus`]'s doc comment.
const WORK_QUEUE_NAMES: &[&str] = &[crate::queue::TASK_CREATED];

const FANOUT_CAPACITY: usize = 1024;

enum QueueChannel {
    Fanout(broadcast::Sender<Vec<u8>>),
    WorkQueue {
        sender: mpsc::UnboundedSender<Vec<u8>>,
        receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    },
}

/// A [`Bus`] backed by process-local channels, one per queue name, created
/// lazily on first use. Queues live for the lifetime of the process; there
/// is no cross-restart durability, matching this crate's role as the
/// in-memory stand-in for a real broker.
#[derive(Clone, Default)]
pub struct LocalBus {
    queues: Arc<Mutex<HashMap<String, QueueChannel>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_queue<R>(&self, queue: &str, f: impl FnOnce(&QueueChannel) -> R) -> R {
        let mut queues = self.queues.lock();
        let channel = queues.entry(queue.to_string()).or_insert_with(|| {
            if WORK_QUEUE_NAMES.contains(&queue) {
                let (sender, receiver) = mpsc::unbounded_channel();
                QueueChannel::WorkQueue { sender, receiver: Arc::new(tokio::sync::Mutex::new(receiver)) }
            } else {
                QueueChannel::Fanout(broadcast::channel(FANOUT_CAPACITY).0)
            }
        });
        f(channel)
    }
}

#[async_trait]
impl Bus for LocalBus {
    async fn publish(&self, queue: &str, envelope: &MessageEnvelope) -> Result<(), BusError> {
        let bytes = serde_json::to_vec(envelope)
            .map_err(|source| BusError::Encode { queue: queue.to_string(), source })?;
        self.with_queue(queue, |channel| match channel {
            // No receivers is not an error in either mode: for fan-out nobody
            // is watching right now; for a work queue the message waits in
            // the buffer for whoever subscribes next.
            QueueChannel::Fanout(sender) => {
                let _ = sender.send(bytes);
            }
            QueueChannel::WorkQueue { sender, .. } => {
                let _ = sender.send(bytes);
            }
        });
        Ok(())
    }

    async fn subscribe(&self, queue: &str) -> Subscription {
        let inner = self.with_queue(queue, |channel| match channel {
            QueueChannel::Fanout(sender) => SubscriptionInner::Fanout(sender.subscribe()),
            QueueChannel::WorkQueue { receiver, .. } => SubscriptionInner::WorkQueue(receiver.clone()),
        });
        Subscription { queue: queue.to_string(), inner }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
