//! In-memory broadcast implementation of [`PushChannel`].

use crate::channel::PushChannel;
use crate::event::PushEvent;
use async_trait::async_trait;
use fabric_core::{Task, WorkerRecord};
use serde_json::Value;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// A [`PushChannel`] backed by a single broadcast channel. No dashboard
/// subscriber can block a sender; a lagging subscriber simply misses the
/// events it couldn't keep up with.
pub struct LocalPushChannel {
    sender: broadcast::Sender<PushEvent>,
}

impl LocalPushChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    fn send(&self, event: PushEvent) {
        // Zero subscribers returns an error too; both cases are fine to ignore,
        // there is nobody watching the dashboard right now.
        let _ = self.sender.send(event);
    }
}

impl Default for LocalPushChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushChannel for LocalPushChannel {
    async fn task_update(&self, task: &Task) {
        self.send(PushEvent::Task(task.clone()));
    }

    async fn worker_update(&self, worker: &WorkerRecord) {
        self.send(PushEvent::Worker(worker.clone()));
    }

    async fn generic(&self, event_type: &str, content: Value) {
        self.send(PushEvent::Generic { event_type: event_type.to_string(), content });
    }

    fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
