//! Task record and status state machine.

use crate::ids::{TaskId, WorkerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// `Completed` and `Failed` are terminal: no further status write should land
/// on a terminal task except via an explicit recovery, which first transitions
/// the task back to `Recovering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Created,
    Assigned,
    Running,
    Completed,
    Failed,
    Migrating,
    Recovering,
}

impl TaskStatus {
    /// Terminal statuses accept no further status writes except through recovery.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Assigned => "ASSIGNED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Migrating => "MIGRATING",
            TaskStatus::Recovering => "RECOVERING",
        };
        write!(f, "{s}")
    }
}

/// The unit of work tracked by the fabric.
///
/// `data` and `checkpoint_data` are opaque to the coordinator — only the
/// worker interprets them, keyed off `task_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub task_type: String,
    pub status: TaskStatus,
    pub priority: i32,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub worker_id: Option<WorkerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub checkpoint_data: Option<serde_json::Value>,
}

impl Task {
    /// Construct a freshly created task. `progress` starts at 0, `status` at
    /// `CREATED`, both timestamps at `now`.
    pub fn new(
        task_type: impl Into<String>,
        priority: i32,
        data: serde_json::Map<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            task_type: task_type.into(),
            status: TaskStatus::Created,
            priority,
            data,
            progress: 0,
            worker_id: None,
            created_at: now,
            updated_at: now,
            checkpoint_data: None,
        }
    }

    pub fn is_owned_by(&self, worker_id: &WorkerId) -> bool {
        self.worker_id.as_ref() == Some(worker_id)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
