//! Bus envelope and the polymorphic content it carries.
//!
//! The wire shape is flat: `{ "type", "task_id"?, "worker_id"?, "content" }`,
//! with `content`'s structure determined by `type`. Rather than traverse
//! `content` generically at every call site, [`MessageEnvelope::decode`]
//! classifies it once into a [`MessageContent`] tagged sum.

use crate::checkpoint::CheckpointRecord;
use crate::error::CoreError;
use crate::ids::{TaskId, WorkerId};
use crate::task::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub worker_id: Option<WorkerId>,
    pub content: serde_json::Value,
}

/// Message type discriminants, as they appear on the wire.
pub mod msg_type {
    pub const TASK_CREATED: &str = "task_created";
    pub const TASK_STATUS: &str = "task_status";
    pub const TASK_MIGRATION: &str = "task_migration";
    pub const TASK_RECOVERY: &str = "task_recovery";
    pub const WORKER_STATUS: &str = "worker_status";
    pub const TASK_CHECKPOINT: &str = "task_checkpoint";
}

/// `{targetWorkerId, fromWorker, toWorker}` — the `task_migration` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationDirective {
    #[serde(rename = "targetWorkerId")]
    pub target_worker_id: WorkerId,
    #[serde(rename = "fromWorker", skip_serializing_if = "Option::is_none", default)]
    pub from_worker: Option<WorkerId>,
    #[serde(rename = "toWorker")]
    pub to_worker: WorkerId,
}

/// `{id, status, task, time}` — the `worker_status` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatusPayload {
    pub id: WorkerId,
    pub status: crate::worker_record::WorkerStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task: Option<TaskId>,
    pub time: DateTime<Utc>,
}

/// Decoded envelope content, classified once at dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Task(Box<Task>),
    Checkpoint(CheckpointRecord),
    Migration(MigrationDirective),
    WorkerStatus(WorkerStatusPayload),
    Generic(serde_json::Value),
}

impl MessageEnvelope {
    pub fn new(
        msg_type: impl Into<String>,
        task_id: Option<TaskId>,
        worker_id: Option<WorkerId>,
        content: &impl Serialize,
    ) -> Result<Self, CoreError> {
        Ok(Self { msg_type: msg_type.into(), task_id, worker_id, content: serde_json::to_value(content)? })
    }

    pub fn task_created(task: &Task) -> Result<Self, CoreError> {
        Self::new(msg_type::TASK_CREATED, Some(task.id), None, task)
    }

    pub fn task_recovery(task: &Task) -> Result<Self, CoreError> {
        Self::new(msg_type::TASK_RECOVERY, Some(task.id), None, task)
    }

    pub fn task_status(task: &Task, worker_id: Option<WorkerId>) -> Result<Self, CoreError> {
        Self::new(msg_type::TASK_STATUS, Some(task.id), worker_id, task)
    }

    pub fn task_migration(
        task_id: TaskId,
        directive: &MigrationDirective,
    ) -> Result<Self, CoreError> {
        Self::new(msg_type::TASK_MIGRATION, Some(task_id), None, directive)
    }

    pub fn task_checkpoint(
        task_id: TaskId,
        worker_id: WorkerId,
        checkpoint: &CheckpointRecord,
    ) -> Result<Self, CoreError> {
        Self::new(msg_type::TASK_CHECKPOINT, Some(task_id), Some(worker_id), checkpoint)
    }

    pub fn worker_status(payload: &WorkerStatusPayload) -> Result<Self, CoreError> {
        Self::new(msg_type::WORKER_STATUS, None, Some(payload.id.clone()), payload)
    }

    /// Classify `content` according to `msg_type`. A `msg_type` outside the
    /// fixed set above (e.g. a push-only event published via
    /// `PushChannel::generic`) decodes as `Generic` rather than erroring —
    /// only a malformed `content` for a *known* type is a decode error.
    pub fn decode(&self) -> Result<MessageContent, CoreError> {
        match self.msg_type.as_str() {
            msg_type::TASK_CREATED | msg_type::TASK_STATUS | msg_type::TASK_RECOVERY => {
                Ok(MessageContent::Task(Box::new(serde_json::from_value(self.content.clone())?)))
            }
            msg_type::TASK_MIGRATION => {
                Ok(MessageContent::Migration(serde_json::from_value(self.content.clone())?))
            }
            msg_type::TASK_CHECKPOINT => {
                Ok(MessageContent::Checkpoint(serde_json::from_value(self.content.clone())?))
            }
            msg_type::WORKER_STATUS => {
                Ok(MessageContent::WorkerStatus(serde_json::from_value(self.content.clone())?))
            }
            _ => Ok(MessageContent::Generic(self.content.clone())),
        }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
