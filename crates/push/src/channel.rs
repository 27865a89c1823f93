//! The `PushChannel` trait: best-effort fan-out of task and worker events
//! to dashboard subscribers.
//!
//! Unlike [`fabric_bus::Bus`], this is explicitly best-effort: a dashboard
//! that falls behind loses events rather than stalling the coordinator. The
//! contract is interface-only per the distilled spec; this crate ships the
//! trait plus an in-memory broadcast implementation.

use crate::event::PushEvent;
use async_trait::async_trait;
use fabric_core::{Task, WorkerRecord};
use serde_json::Value;
use tokio::sync::broadcast;

#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Notify subscribers of a task's current state.
    async fn task_update(&self, task: &Task);

    /// Notify subscribers of a worker's current state.
    async fn worker_update(&self, worker: &WorkerRecord);

    /// Notify subscribers of an arbitrary event, for producers that don't
    /// map cleanly onto `Task`/`WorkerRecord` (e.g. an admin-forced action).
    async fn generic(&self, event_type: &str, content: Value);

    /// Subscribe to the event stream. Implementations should let a slow
    /// subscriber drop events rather than applying backpressure upstream.
    fn subscribe(&self) -> broadcast::Receiver<PushEvent>;
}
