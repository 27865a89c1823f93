//! The worker runtime core: a task's execution loop plus the status,
//! checkpoint, and heartbeat emitters it shares with the background tasks in
//! [`crate::runtime`].

use crate::config::WorkerConfig;
use fabric_bus::{queue, Bus};
use fabric_core::{
    checkpoint_key, task_key, CheckpointRecord, Clock, MessageEnvelope, Task, TaskId, TaskStatus,
    WorkerId, WorkerStatus, WorkerStatusPayload,
};
use fabric_store::{Store, StoreJsonExt};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct LocalState {
    status: WorkerStatus,
    current_task_id: Option<TaskId>,
}

/// One worker's view of the fabric: its identity, its collaborators, and the
/// single in-flight task it owns at a time.
///
/// `state` is the only lock here (per §5's "worker's own status/current-task
/// fields: single lock"); it's always released before a bus publish or store
/// call, never held across an `.await`.
pub struct WorkerRuntime<C: Clock> {
    id: WorkerId,
    bus: Arc<dyn Bus>,
    store: Arc<dyn Store>,
    clock: C,
    config: WorkerConfig,
    state: Mutex<LocalState>,
}

impl<C: Clock> WorkerRuntime<C> {
    pub fn new(id: WorkerId, bus: Arc<dyn Bus>, store: Arc<dyn Store>, clock: C, config: WorkerConfig) -> Arc<Self> {
        Arc::new(Self {
            id,
            bus,
            store,
            clock,
            config,
            state: Mutex::new(LocalState { status: WorkerStatus::Idle, current_task_id: None }),
        })
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    pub fn status(&self) -> WorkerStatus {
        self.state.lock().status
    }

    pub fn current_task_id(&self) -> Option<TaskId> {
        self.state.lock().current_task_id
    }

    fn set_busy(&self, task_id: TaskId) {
        let mut state = self.state.lock();
        state.status = WorkerStatus::Busy;
        state.current_task_id = Some(task_id);
    }

    fn set_idle(&self) {
        let mut state = self.state.lock();
        state.status = WorkerStatus::Idle;
        state.current_task_id = None;
    }

    /// Run `task` to completion, failure, or cooperative cancellation,
    /// starting at `start_progress` (0 for a fresh dispatch, the resumed
    /// checkpoint's progress otherwise).
    ///
    /// Shutdown is honored only at step boundaries — a step in flight always
    /// finishes, matching §5's "no forced abort mid-step".
    pub async fn execute_task(&self, mut task: Task, start_progress: u8, cancel: &CancellationToken) {
        self.set_busy(task.id);
        task.worker_id = Some(self.id.clone());
        task.status = TaskStatus::Running;
        task.progress = start_progress;
        task.updated_at = self.clock.now_utc();
        self.emit_status(&task).await;

        let fail_probability = if start_progress == 0 {
            self.config.fail_probability_fresh
        } else {
            self.config.fail_probability_recovered
        };

        let step_size = step_size(self.config.steps as u32);
        let start_step = (start_progress as u32) / step_size;
        let mut last_checkpoint = self.clock.now();

        for step in (start_step + 1)..=(self.config.steps as u32) {
            if cancel.is_cancelled() {
                self.set_idle();
                return;
            }

            tokio::time::sleep(self.random_step_delay()).await;

            task.progress = progress_at_step(step, step_size);
            task.updated_at = self.clock.now_utc();
            self.emit_status(&task).await;

            if self.clock.now().duration_since(last_checkpoint) >= self.config.checkpoint_interval {
                self.emit_checkpoint(&mut task).await;
                last_checkpoint = self.clock.now();
            }

            if rand::thread_rng().gen_bool(fail_probability) {
                task.status = TaskStatus::Failed;
                task.updated_at = self.clock.now_utc();
                self.emit_status(&task).await;
                self.set_idle();
                return;
            }
        }

        task.status = TaskStatus::Completed;
        task.progress = 100;
        task.updated_at = self.clock.now_utc();
        self.emit_status(&task).await;
        self.set_idle();
    }

    fn random_step_delay(&self) -> Duration {
        let min = self.config.step_delay_min.as_millis() as u64;
        let max = self.config.step_delay_max.as_millis() as u64;
        let millis = if max > min { rand::thread_rng().gen_range(min..=max) } else { min };
        Duration::from_millis(millis)
    }

    async fn emit_status(&self, task: &Task) {
        if let Err(err) = self.store.set_json(&task_key(&task.id), task).await {
            tracing::warn!(task_id = %task.id, error = %err, "failed to persist task status");
        }
        match MessageEnvelope::task_status(task, Some(self.id.clone())) {
            Ok(envelope) => {
                if let Err(err) = self.bus.publish(queue::TASK_STATUS, &envelope).await {
                    tracing::warn!(task_id = %task.id, error = %err, "failed to publish task status");
                }
            }
            Err(err) => tracing::warn!(task_id = %task.id, error = %err, "failed to encode task status envelope"),
        }
    }

    /// Opportunistic, non-blocking: a failure here never interrupts the step
    /// loop, it's logged and the next tick tries again.
    async fn emit_checkpoint(&self, task: &mut Task) {
        let checkpoint = CheckpointRecord::new(task.progress, self.clock.now_utc());
        match serde_json::to_value(&checkpoint) {
            Ok(value) => task.checkpoint_data = Some(value),
            Err(err) => tracing::warn!(task_id = %task.id, error = %err, "failed to encode checkpoint data onto task"),
        }
        if let Err(err) = self.store.set_json(&checkpoint_key(&task.id, task.progress), &checkpoint).await {
            tracing::warn!(task_id = %task.id, error = %err, "failed to persist checkpoint");
            return;
        }
        match MessageEnvelope::task_checkpoint(task.id, self.id.clone(), &checkpoint) {
            Ok(envelope) => {
                if let Err(err) = self.bus.publish(queue::TASK_CHECKPOINT, &envelope).await {
                    tracing::warn!(task_id = %task.id, error = %err, "failed to publish checkpoint");
                }
            }
            Err(err) => tracing::warn!(task_id = %task.id, error = %err, "failed to encode checkpoint envelope"),
        }
    }

    pub async fn publish_heartbeat(&self) {
        let payload = WorkerStatusPayload {
            id: self.id.clone(),
            status: self.status(),
            task: self.current_task_id(),
            time: self.clock.now_utc(),
        };
        match MessageEnvelope::worker_status(&payload) {
            Ok(envelope) => {
                if let Err(err) = self.bus.publish(queue::WORKER_STATUS, &envelope).await {
                    tracing::warn!(worker_id = %self.id, error = %err, "failed to publish heartbeat");
                }
            }
            Err(err) => tracing::warn!(worker_id = %self.id, error = %err, "failed to encode heartbeat"),
        }
    }
}

/// The progress span of one equal-sized step out of `total_steps`, never
/// zero so a pathological config (e.g. `steps: 0`) still terminates.
fn step_size(total_steps: u32) -> u32 {
    (100u32 / total_steps.max(1)).max(1)
}

/// Progress after completing `step` of `step_size`-wide steps, capped at 100.
fn progress_at_step(step: u32, step_size: u32) -> u8 {
    ((step * step_size) as u8).min(100)
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
