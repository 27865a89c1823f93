//! Immutable progress snapshots that make task resumption possible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable snapshot of a task at a given progress level.
///
/// Keyed externally by `(task_id, progress)` in the store; this type carries
/// only the payload, not the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub timestamp: DateTime<Utc>,
    pub progress: u8,
    pub step: String,
}

impl CheckpointRecord {
    pub fn new(progress: u8, now: DateTime<Utc>) -> Self {
        Self { timestamp: now, progress, step: format!("step_{}", progress / 10) }
    }
}
