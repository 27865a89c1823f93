//! The coordinator core: authoritative task registry, worker roster, and
//! failure-driven recovery/migration dispatch.

use crate::error::CoordinatorError;
use fabric_bus::{queue, Bus};
use fabric_core::{
    msg_type, Clock, MessageContent, MessageEnvelope, MigrationDirective, Task, TaskId, TaskStatus,
    WorkerId, WorkerRecord, WorkerStatus, WorkerStatusPayload,
};
use fabric_push::PushChannel;
use fabric_store::{gc_if_terminal, CheckpointRetention, Store, StoreJsonExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default liveness timeout: 30s without a heartbeat marks a worker FAILING.
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(30);

/// The task and worker registries are owned here, not ambient global state:
/// constructed after rehydration, torn down on shutdown by dropping this
/// value. `Bus`/`Store`/`PushChannel` are injected as trait objects so the
/// in-memory reference implementations can be swapped for real backends
/// without touching this code.
pub struct Coordinator<C: Clock> {
    tasks: RwLock<HashMap<TaskId, Task>>,
    workers: RwLock<HashMap<WorkerId, WorkerRecord>>,
    bus: Arc<dyn Bus>,
    store: Arc<dyn Store>,
    push: Arc<dyn PushChannel>,
    clock: C,
    liveness_timeout: Duration,
    checkpoint_retention: CheckpointRetention,
}

impl<C: Clock> Coordinator<C> {
    pub fn new(bus: Arc<dyn Bus>, store: Arc<dyn Store>, push: Arc<dyn PushChannel>, clock: C) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            workers: RwLock::new(HashMap::new()),
            bus,
            store,
            push,
            clock,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            checkpoint_retention: CheckpointRetention::Keep,
        }
    }

    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    pub fn with_checkpoint_retention(mut self, policy: CheckpointRetention) -> Self {
        self.checkpoint_retention = policy;
        self
    }

    /// Enumerate `task:*` in the store and populate the in-memory cache.
    /// Non-terminal tasks are left exactly as persisted — they are not
    /// reassigned here; the liveness sweeper picks them up once their
    /// owner's absence is detected. Running this twice against the same
    /// store yields the same cache (testable property #6).
    pub async fn rehydrate(&self) -> Result<(), CoordinatorError> {
        let keys = self.store.scan_prefix(fabric_core::TASK_PREFIX).await?;
        let mut loaded = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(task) = self.store.get_json::<Task>(&key).await? {
                loaded.insert(task.id, task);
            }
        }
        *self.tasks.write() = loaded;
        Ok(())
    }

    pub async fn create_task(
        &self,
        task_type: impl Into<String>,
        priority: i32,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Task, CoordinatorError> {
        let task = Task::new(task_type, priority, data, self.clock.now_utc());

        self.tasks.write().insert(task.id, task.clone());

        if let Err(err) = self.persist_and_announce_creation(&task).await {
            self.tasks.write().remove(&task.id);
            return Err(err);
        }

        Ok(task)
    }

    async fn persist_and_announce_creation(&self, task: &Task) -> Result<(), CoordinatorError> {
        self.store.set_json(&fabric_core::task_key(&task.id), task).await?;
        let envelope = MessageEnvelope::task_created(task)?;
        self.bus.publish(queue::TASK_CREATED, &envelope).await?;
        self.push.task_update(task).await;
        Ok(())
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.tasks.read().values().cloned().collect()
    }

    pub fn get_task(&self, id: TaskId) -> Option<Task> {
        self.tasks.read().get(&id).cloned()
    }

    pub fn list_workers(&self) -> Vec<WorkerRecord> {
        self.workers.read().values().cloned().collect()
    }

    /// Operator-initiated reassignment of a non-terminal task. Transitions
    /// the task to MIGRATING, persists, and publishes a `task_migration`
    /// envelope on `task_status` carrying the source/target worker ids; the
    /// target worker's own recovery-start path does the rest.
    pub async fn migrate_task(
        &self,
        task_id: TaskId,
        target_worker_id: WorkerId,
    ) -> Result<Task, CoordinatorError> {
        let mut task = self.tasks.read().get(&task_id).cloned().ok_or(CoordinatorError::TaskNotFound(task_id))?;

        let from_worker = task.worker_id.clone();
        task.status = TaskStatus::Migrating;
        task.updated_at = self.clock.now_utc();
        self.tasks.write().insert(task.id, task.clone());
        self.store.set_json(&fabric_core::task_key(&task.id), &task).await?;

        let directive = MigrationDirective {
            target_worker_id: target_worker_id.clone(),
            from_worker,
            to_worker: target_worker_id,
        };
        let envelope = MessageEnvelope::task_migration(task.id, &directive)?;
        self.bus.publish(queue::TASK_STATUS, &envelope).await?;
        self.push.generic(msg_type::TASK_MIGRATION, serde_json::to_value(&directive).unwrap_or_default()).await;
        self.push.task_update(&task).await;

        Ok(task)
    }

    /// Admin/debug: force a worker's roster entry to FAILING and rewind its
    /// `last_seen` past the liveness threshold, then immediately run a sweep
    /// so the effect is observable without waiting for the next tick.
    pub async fn fail_worker(&self, id: &WorkerId) -> Result<(), CoordinatorError> {
        let updated = {
            let mut workers = self.workers.write();
            let worker = workers.get_mut(id).ok_or_else(|| CoordinatorError::WorkerNotFound(id.clone()))?;
            worker.status = WorkerStatus::Failing;
            worker.last_seen = self.clock.now_utc() - chrono_duration(self.liveness_timeout) - chrono::Duration::seconds(1);
            worker.clone()
        };
        self.push.worker_update(&updated).await;
        self.run_liveness_sweep().await
    }

    /// Handle one `worker_status` envelope: upsert the roster entry and
    /// refresh `last_seen`. Any heartbeat is treated as a liveness refresh
    /// regardless of its reported status, per the ordering guarantee in the
    /// concurrency model.
    pub async fn handle_worker_status(&self, envelope: &MessageEnvelope) {
        let content = match envelope.decode() {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed worker_status envelope");
                return;
            }
        };
        let MessageContent::WorkerStatus(payload) = content else {
            tracing::warn!("worker_status envelope decoded to unexpected content, dropping");
            return;
        };
        let record = self.upsert_worker_from_heartbeat(payload);
        self.push.worker_update(&record).await;
    }

    fn upsert_worker_from_heartbeat(&self, payload: WorkerStatusPayload) -> WorkerRecord {
        let mut workers = self.workers.write();
        let record = workers.entry(payload.id.clone()).or_insert_with(|| WorkerRecord {
            id: payload.id.clone(),
            status: payload.status,
            current_task_id: payload.task,
            last_seen: payload.time,
        });
        record.status = payload.status;
        record.current_task_id = payload.task;
        record.last_seen = payload.time;
        record.clamp();
        record.clone()
    }

    /// Handle one `task_status` envelope: overwrite the in-memory cache
    /// entry, write through to the store, and broadcast. Last-writer-wins by
    /// `updated_at`, since the bus may redeliver or reorder.
    pub async fn handle_task_status(&self, envelope: &MessageEnvelope) {
        let content = match envelope.decode() {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed task_status envelope");
                return;
            }
        };
        let task = match content {
            MessageContent::Task(task) => *task,
            other => {
                tracing::debug!(?other, "task_status envelope did not carry a Task, ignoring");
                return;
            }
        };
        self.apply_incoming_task(task).await;
    }

    async fn apply_incoming_task(&self, incoming: Task) {
        let should_apply = {
            let tasks = self.tasks.read();
            match tasks.get(&incoming.id) {
                Some(existing) => incoming.updated_at >= existing.updated_at,
                None => true,
            }
        };
        if !should_apply {
            tracing::debug!(task_id = %incoming.id, "ignoring stale out-of-order task_status");
            return;
        }

        self.tasks.write().insert(incoming.id, incoming.clone());
        if let Err(err) = self.store.set_json(&fabric_core::task_key(&incoming.id), &incoming).await {
            tracing::warn!(task_id = %incoming.id, error = %err, "failed to write through task status");
        }
        if incoming.status.is_terminal() {
            if let Err(err) = gc_if_terminal(self.store.as_ref(), &incoming.id, self.checkpoint_retention).await {
                tracing::warn!(task_id = %incoming.id, error = %err, "checkpoint GC failed");
            }
        }
        self.push.task_update(&incoming).await;
    }

    /// One liveness sweep: mark stale workers FAILING and drive recovery for
    /// whatever non-terminal task they owned. Roster mutation and recovery
    /// dispatch are single-writer here — callers never interleave sweeps.
    pub async fn run_liveness_sweep(&self) -> Result<(), CoordinatorError> {
        let now = self.clock.now_utc();
        let stale: Vec<WorkerRecord> = {
            let mut workers = self.workers.write();
            workers
                .values_mut()
                .filter(|w| {
                    w.status != WorkerStatus::Shutdown
                        && (now - w.last_seen) > chrono_duration(self.liveness_timeout)
                })
                .map(|w| {
                    w.status = WorkerStatus::Failing;
                    w.clone()
                })
                .collect()
        };

        for worker in &stale {
            self.push.worker_update(worker).await;
            if let Some(task_id) = worker.current_task_id {
                self.recover_task_owned_by(task_id, &worker.id).await?;
            }
        }
        Ok(())
    }

    async fn recover_task_owned_by(&self, task_id: TaskId, failed_owner: &WorkerId) -> Result<(), CoordinatorError> {
        let Some(mut task) = self.tasks.read().get(&task_id).cloned() else { return Ok(()) };
        if task.status.is_terminal() {
            return Ok(());
        }
        if !matches!(task.status, TaskStatus::Assigned | TaskStatus::Running | TaskStatus::Migrating) {
            return Ok(());
        }
        if task.worker_id.as_ref() != Some(failed_owner) {
            return Ok(());
        }

        task.status = TaskStatus::Recovering;
        task.updated_at = self.clock.now_utc();
        self.tasks.write().insert(task.id, task.clone());
        self.store.set_json(&fabric_core::task_key(&task.id), &task).await?;
        self.push.task_update(&task).await;

        let envelope = MessageEnvelope::task_recovery(&task)?;
        self.bus.publish(queue::TASK_CREATED, &envelope).await?;
        Ok(())
    }
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero())
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
