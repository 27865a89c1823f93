//! Events fanned out to dashboard subscribers.

use fabric_core::{Task, WorkerRecord};
use serde::Serialize;
use serde_json::Value;

/// One update pushed to the dashboard. Serialized as `{"kind": ..., ...}` for
/// the WebSocket wire framing described in the admin surface contract.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PushEvent {
    Task(Task),
    Worker(WorkerRecord),
    Generic {
        #[serde(rename = "type")]
        event_type: String,
        content: Value,
    },
}
