use super::*;
use crate::config::WorkerConfig;
use crate::worker::WorkerRuntime;
use fabric_bus::LocalBus;
use fabric_core::test_support::TaskBuilder;
use fabric_core::{CheckpointRecord, FakeClock, MessageEnvelope, MigrationDirective, TaskStatus, WorkerId};
use fabric_store::{MemoryStore, StoreJsonExt};
use std::time::Duration as StdDuration;

fn test_config() -> WorkerConfig {
    WorkerConfig {
        steps: 2,
        step_delay_min: StdDuration::from_millis(1),
        step_delay_max: StdDuration::from_millis(1),
        fail_probability_fresh: 0.0,
        fail_probability_recovered: 0.0,
        checkpoint_interval: StdDuration::from_secs(3600),
        heartbeat_interval: StdDuration::from_secs(3600),
        intake_capacity: 10,
    }
}

async fn wait_for_terminal(store: &MemoryStore, task_id: fabric_core::TaskId) -> Task {
    for _ in 0..200 {
        if let Some(task) = store.get_json::<Task>(&fabric_core::task_key(&task_id)).await.unwrap() {
            if task.status.is_terminal() {
                return task;
            }
        }
        tokio::time::sleep(StdDuration::from_millis(5)).await;
    }
    panic!("task never reached a terminal status");
}

#[tokio::test]
async fn a_fresh_dispatch_on_the_task_created_queue_runs_to_completion() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let worker = WorkerRuntime::new(WorkerId::new("w1"), bus.clone(), store.clone(), FakeClock::new(), test_config());

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run(worker, cancel.clone()));

    let task = TaskBuilder::default().build();
    let task_id = task.id;
    let envelope = MessageEnvelope::task_created(&task).unwrap();
    bus.publish(fabric_bus::queue::TASK_CREATED, &envelope).await.unwrap();

    let finished = wait_for_terminal(&store, task_id).await;
    assert_eq!(finished.status, TaskStatus::Completed);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn a_migration_directive_targeting_this_worker_loads_and_resumes_the_task() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let worker = WorkerRuntime::new(WorkerId::new("w2"), bus.clone(), store.clone(), FakeClock::new(), test_config());

    let task = TaskBuilder::default().status(TaskStatus::Migrating).worker_id("w1").progress(50).build();
    store.set_json(&fabric_core::task_key(&task.id), &task).await.unwrap();
    let checkpoint = CheckpointRecord::new(50, chrono::Utc::now());
    store.set_json(&fabric_core::checkpoint_key(&task.id, 50), &checkpoint).await.unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run(worker, cancel.clone()));

    let directive = MigrationDirective {
        target_worker_id: WorkerId::new("w2"),
        from_worker: Some(WorkerId::new("w1")),
        to_worker: WorkerId::new("w2"),
    };
    let envelope = MessageEnvelope::task_migration(task.id, &directive).unwrap();
    bus.publish(fabric_bus::queue::TASK_STATUS, &envelope).await.unwrap();

    let finished = wait_for_terminal(&store, task.id).await;
    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(finished.worker_id, Some(WorkerId::new("w2")));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn a_migration_directive_targeting_another_worker_is_ignored() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let worker = WorkerRuntime::new(WorkerId::new("w3"), bus.clone(), store.clone(), FakeClock::new(), test_config());

    let task = TaskBuilder::default().status(TaskStatus::Migrating).worker_id("w1").progress(50).build();
    store.set_json(&fabric_core::task_key(&task.id), &task).await.unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run(worker, cancel.clone()));

    let directive = MigrationDirective {
        target_worker_id: WorkerId::new("someone-else"),
        from_worker: Some(WorkerId::new("w1")),
        to_worker: WorkerId::new("someone-else"),
    };
    let envelope = MessageEnvelope::task_migration(task.id, &directive).unwrap();
    bus.publish(fabric_bus::queue::TASK_STATUS, &envelope).await.unwrap();

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    let unchanged = store.get_json::<Task>(&fabric_core::task_key(&task.id)).await.unwrap().unwrap();
    assert_eq!(unchanged.status, TaskStatus::Migrating);

    cancel.cancel();
    handle.await.unwrap();
}
