//! Coordinator-side view of a worker.

use crate::ids::{TaskId, WorkerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Overloaded,
    Failing,
    Shutdown,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerStatus::Idle => "IDLE",
            WorkerStatus::Busy => "BUSY",
            WorkerStatus::Overloaded => "OVERLOADED",
            WorkerStatus::Failing => "FAILING",
            WorkerStatus::Shutdown => "SHUTDOWN",
        };
        write!(f, "{s}")
    }
}

/// The coordinator's roster entry for a worker.
///
/// The coordinator is the sole authority on this record; a worker never
/// writes it directly, it only publishes heartbeats that the coordinator
/// folds into this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub status: WorkerStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_task_id: Option<TaskId>,
    pub last_seen: DateTime<Utc>,
}

impl WorkerRecord {
    pub fn new_idle(id: WorkerId, now: DateTime<Utc>) -> Self {
        Self { id, status: WorkerStatus::Idle, current_task_id: None, last_seen: now }
    }

    /// `BUSY ⇒ current_task_id ≠ ∅` — callers that violate this invariant are
    /// clamped to a consistent state rather than trusted blindly, since worker
    /// heartbeats arrive over an at-least-once bus and may be stale or malformed.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            WorkerStatus::Busy => self.current_task_id.is_some(),
            _ => true,
        }
    }

    /// Enforce the invariant `is_consistent` describes: a `BUSY` record with
    /// no task is downgraded to `IDLE` rather than trusted as-is.
    pub fn clamp(&mut self) {
        if !self.is_consistent() {
            self.status = WorkerStatus::Idle;
        }
    }
}

#[cfg(test)]
#[path = "worker_record_tests.rs"]
mod tests;
