//! Test builders and proptest strategies, enabled via the `test-support` feature
//! so downstream crates can build fixtures without duplicating this logic.

use crate::ids::{TaskId, WorkerId};
use crate::task::{Task, TaskStatus};
use crate::worker_record::{WorkerRecord, WorkerStatus};
use chrono::Utc;

/// Builder for [`Task`] fixtures. Defaults to a freshly created task.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self { task: Task::new("test", 0, Default::default(), Utc::now()) }
    }

    pub fn id(mut self, id: TaskId) -> Self {
        self.task.id = id;
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.task.progress = progress;
        self
    }

    pub fn worker_id(mut self, worker_id: impl Into<WorkerId>) -> Self {
        self.task.worker_id = Some(worker_id.into());
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn idle_worker(id: &str) -> WorkerRecord {
    WorkerRecord::new_idle(WorkerId::new(id), Utc::now())
}

pub fn busy_worker(id: &str, task_id: TaskId) -> WorkerRecord {
    let mut w = idle_worker(id);
    w.status = WorkerStatus::Busy;
    w.current_task_id = Some(task_id);
    w
}

#[cfg(feature = "proptest")]
pub mod strategies {
    use super::*;
    use proptest::prelude::*;

    /// A progress value in the valid 0..=100 range.
    pub fn progress() -> impl Strategy<Value = u8> {
        0u8..=100
    }

    pub fn task_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Created),
            Just(TaskStatus::Assigned),
            Just(TaskStatus::Running),
            Just(TaskStatus::Completed),
            Just(TaskStatus::Failed),
            Just(TaskStatus::Migrating),
            Just(TaskStatus::Recovering),
        ]
    }
}
