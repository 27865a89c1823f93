use super::*;
use fabric_bus::{queue, Bus, LocalBus};
use fabric_core::test_support::TaskBuilder;
use fabric_core::{checkpoint_key, checkpoint_prefix, CheckpointRecord, FakeClock, SystemClock, TaskStatus};
use fabric_store::{MemoryStore, StoreJsonExt};
use std::time::Duration;

fn fast_config(fail_probability: f64) -> WorkerConfig {
    WorkerConfig {
        steps: 2,
        step_delay_min: Duration::from_millis(1),
        step_delay_max: Duration::from_millis(1),
        fail_probability_fresh: fail_probability,
        fail_probability_recovered: fail_probability,
        checkpoint_interval: Duration::from_secs(3600),
        heartbeat_interval: Duration::from_secs(3600),
        intake_capacity: 10,
    }
}

#[tokio::test]
async fn fresh_task_with_zero_fail_probability_runs_to_completion() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let worker = WorkerRuntime::new(WorkerId::new("w1"), bus.clone(), store.clone(), FakeClock::new(), fast_config(0.0));
    let mut sub = bus.subscribe(queue::TASK_STATUS).await;

    let task = TaskBuilder::default().build();
    let task_id = task.id;
    let cancel = CancellationToken::new();
    worker.execute_task(task, 0, &cancel).await;

    assert_eq!(worker.status(), WorkerStatus::Idle);
    assert_eq!(worker.current_task_id(), None);

    let stored: Task = store.get_json(&task_key(&task_id)).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.progress, 100);

    // RUNNING, step 1 (50%), step 2 (100%), then the terminal COMPLETED emission.
    for _ in 0..4 {
        sub.recv().await.unwrap();
    }
}

#[tokio::test]
async fn a_guaranteed_failure_marks_the_task_failed_and_returns_to_idle() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let worker = WorkerRuntime::new(WorkerId::new("w1"), bus, store.clone(), FakeClock::new(), fast_config(1.0));

    let task = TaskBuilder::default().build();
    let task_id = task.id;
    let cancel = CancellationToken::new();
    worker.execute_task(task, 0, &cancel).await;

    assert_eq!(worker.status(), WorkerStatus::Idle);
    let stored: Task = store.get_json(&task_key(&task_id)).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
}

#[tokio::test]
async fn resuming_from_a_checkpointed_progress_only_runs_the_remaining_steps() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let mut config = fast_config(0.0);
    config.steps = 10;
    let worker = WorkerRuntime::new(WorkerId::new("w1"), bus, store.clone(), FakeClock::new(), config);

    let task = TaskBuilder::default().progress(50).build();
    let task_id = task.id;
    let cancel = CancellationToken::new();
    worker.execute_task(task, 50, &cancel).await;

    let stored: Task = store.get_json(&task_key(&task_id)).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.progress, 100);
}

#[tokio::test]
async fn cancellation_is_honored_at_the_next_step_boundary() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let mut config = fast_config(0.0);
    config.steps = 10;
    config.step_delay_min = Duration::from_millis(50);
    config.step_delay_max = Duration::from_millis(50);
    let worker = WorkerRuntime::new(WorkerId::new("w1"), bus, store.clone(), FakeClock::new(), config);

    let task = TaskBuilder::default().build();
    let task_id = task.id;
    let cancel = CancellationToken::new();
    cancel.cancel();
    worker.execute_task(task, 0, &cancel).await;

    assert_eq!(worker.status(), WorkerStatus::Idle);
    // RUNNING was emitted before the first cancellation check; the task never
    // reaches a terminal status.
    let stored: Task = store.get_json(&task_key(&task_id)).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Running);
}

#[tokio::test]
async fn a_fired_checkpoint_is_recorded_on_the_task_itself() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let config = WorkerConfig {
        steps: 5,
        step_delay_min: Duration::from_millis(5),
        step_delay_max: Duration::from_millis(5),
        fail_probability_fresh: 0.0,
        fail_probability_recovered: 0.0,
        checkpoint_interval: Duration::from_millis(2),
        heartbeat_interval: Duration::from_secs(3600),
        intake_capacity: 10,
    };
    // Checkpoint timing runs off real elapsed time between steps, so this
    // needs a real clock rather than the frozen `FakeClock`.
    let worker = WorkerRuntime::new(WorkerId::new("w1"), bus, store.clone(), SystemClock, config);

    let task = TaskBuilder::default().build();
    let task_id = task.id;
    let cancel = CancellationToken::new();
    worker.execute_task(task, 0, &cancel).await;

    let checkpoint_keys = store.scan_prefix(&checkpoint_prefix(&task_id)).await.unwrap();
    assert!(!checkpoint_keys.is_empty(), "a checkpoint should have fired over 5 steps of 5ms each");

    let stored: Task = store.get_json(&task_key(&task_id)).await.unwrap().unwrap();
    let checkpoint_data = stored.checkpoint_data.expect("a fired checkpoint must be recorded on the task");
    let checkpoint: CheckpointRecord = serde_json::from_value(checkpoint_data).unwrap();
    assert!(checkpoint.progress <= stored.progress);
    assert!(checkpoint_keys.contains(&checkpoint_key(&task_id, checkpoint.progress)));
}

#[tokio::test]
async fn heartbeat_carries_the_workers_current_status_and_task() {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let worker = WorkerRuntime::new(WorkerId::new("w1"), bus.clone(), store, FakeClock::new(), fast_config(0.0));
    let mut sub = bus.subscribe(queue::WORKER_STATUS).await;

    worker.publish_heartbeat().await;

    let envelope = sub.recv().await.unwrap();
    let content = envelope.decode().unwrap();
    match content {
        fabric_core::MessageContent::WorkerStatus(payload) => {
            assert_eq!(payload.id, WorkerId::new("w1"));
            assert_eq!(payload.status, WorkerStatus::Idle);
            assert_eq!(payload.task, None);
        }
        other => panic!("expected a worker_status payload, got {other:?}"),
    }
}

mod progress_properties {
    use super::{progress_at_step, step_size};
    use proptest::prelude::*;

    proptest! {
        /// Property #1 (partial): within a single execution run, progress is
        /// non-decreasing across successive steps and reaches exactly 100.
        #[test]
        fn progress_is_non_decreasing_and_terminates_at_100(total_steps in 1u32..=50) {
            let size = step_size(total_steps);
            let mut last = 0u8;
            for step in 1..=total_steps {
                let progress = progress_at_step(step, size);
                prop_assert!(progress >= last);
                last = progress;
            }
            prop_assert_eq!(last, 100);
        }
    }
}

mod status_properties {
    use super::*;
    use fabric_core::test_support::strategies::task_status;
    use proptest::prelude::*;

    proptest! {
        /// Whatever status a task carries when `emit_status` runs, the
        /// status stored in the backing store matches it afterward.
        #[test]
        fn every_status_round_trips_through_emit_status(status in task_status()) {
            let stored_status = tokio::runtime::Runtime::new().expect("runtime").block_on(async move {
                let bus = Arc::new(LocalBus::new());
                let store = Arc::new(MemoryStore::new());
                let worker = WorkerRuntime::new(WorkerId::new("w1"), bus, store.clone(), FakeClock::new(), fast_config(0.0));
                let mut task = TaskBuilder::default().status(status).build();
                task.worker_id = Some(WorkerId::new("w1"));
                worker.emit_status(&task).await;
                let stored: Task = store.get_json(&task_key(&task.id)).await.expect("get").expect("present");
                stored.status
            });
            prop_assert_eq!(stored_status, status);
        }
    }
}
