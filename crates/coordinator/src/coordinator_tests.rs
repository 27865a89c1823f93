use super::*;
use fabric_bus::{queue, Bus, LocalBus};
use fabric_core::test_support::TaskBuilder;
use fabric_core::{msg_type, FakeClock, MessageEnvelope, TaskStatus, WorkerId, WorkerStatus, WorkerStatusPayload};
use fabric_push::LocalPushChannel;
use fabric_store::{MemoryStore, Store};

fn wired() -> (Coordinator<FakeClock>, Arc<LocalBus>, Arc<MemoryStore>) {
    let clock = FakeClock::new();
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(LocalPushChannel::new());
    let coordinator = Coordinator::new(bus.clone(), store.clone(), push, clock);
    (coordinator, bus, store)
}

#[tokio::test]
async fn create_task_inserts_persists_and_publishes() {
    let (coordinator, bus, store) = wired();
    let mut sub = bus.subscribe(queue::TASK_CREATED).await;

    let task = coordinator.create_task("img", 1, Default::default()).await.unwrap();

    assert_eq!(coordinator.list_tasks().len(), 1);
    assert_eq!(coordinator.get_task(task.id).unwrap().id, task.id);
    assert!(store.get(&fabric_core::task_key(&task.id)).await.unwrap().is_some());

    let received = sub.recv().await.unwrap();
    assert_eq!(received.msg_type, msg_type::TASK_CREATED);
    assert_eq!(received.task_id, Some(task.id));
}

#[tokio::test]
async fn get_task_returns_none_for_unknown_id() {
    let (coordinator, _bus, _store) = wired();
    assert!(coordinator.get_task(fabric_core::TaskId::new()).is_none());
}

#[tokio::test]
async fn migrate_task_transitions_status_and_publishes_directive() {
    let (coordinator, bus, _store) = wired();
    let mut sub = bus.subscribe(queue::TASK_STATUS).await;
    let task = coordinator.create_task("img", 0, Default::default()).await.unwrap();

    let migrated = coordinator.migrate_task(task.id, WorkerId::new("w2")).await.unwrap();
    assert_eq!(migrated.status, TaskStatus::Migrating);

    let envelope = sub.recv().await.unwrap();
    assert_eq!(envelope.msg_type, msg_type::TASK_MIGRATION);
    let content = envelope.decode().unwrap();
    match content {
        fabric_core::MessageContent::Migration(directive) => {
            assert_eq!(directive.target_worker_id, WorkerId::new("w2"));
            assert_eq!(directive.to_worker, WorkerId::new("w2"));
        }
        other => panic!("expected a migration directive, got {other:?}"),
    }
}

#[tokio::test]
async fn migrate_task_on_unknown_id_is_not_found() {
    let (coordinator, _bus, _store) = wired();
    let err = coordinator.migrate_task(fabric_core::TaskId::new(), WorkerId::new("w2")).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::TaskNotFound(_)));
}

#[tokio::test]
async fn fail_worker_on_unknown_id_is_not_found() {
    let (coordinator, _bus, _store) = wired();
    let err = coordinator.fail_worker(&WorkerId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::WorkerNotFound(_)));
}

#[tokio::test]
async fn worker_status_envelope_upserts_roster_and_refreshes_last_seen() {
    let (coordinator, _bus, _store) = wired();
    let payload = WorkerStatusPayload {
        id: WorkerId::new("w1"),
        status: WorkerStatus::Idle,
        task: None,
        time: chrono::Utc::now(),
    };
    let envelope = MessageEnvelope::worker_status(&payload).unwrap();

    coordinator.handle_worker_status(&envelope).await;

    let workers = coordinator.list_workers();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].id, WorkerId::new("w1"));
    assert_eq!(workers[0].status, WorkerStatus::Idle);
}

#[tokio::test]
async fn a_busy_heartbeat_with_no_task_is_clamped_to_idle_on_the_roster() {
    let (coordinator, _bus, _store) = wired();
    let payload = WorkerStatusPayload {
        id: WorkerId::new("w1"),
        status: WorkerStatus::Busy,
        task: None,
        time: chrono::Utc::now(),
    };
    let envelope = MessageEnvelope::worker_status(&payload).unwrap();

    coordinator.handle_worker_status(&envelope).await;

    let workers = coordinator.list_workers();
    assert_eq!(workers[0].status, WorkerStatus::Idle);
    assert_eq!(workers[0].current_task_id, None);
}

#[tokio::test]
async fn task_status_envelope_is_last_writer_wins_by_updated_at() {
    let (coordinator, _bus, _store) = wired();
    let older = TaskBuilder::default().progress(10).build();
    let mut newer = older.clone();
    newer.progress = 50;
    newer.updated_at = older.updated_at + chrono::Duration::seconds(1);

    coordinator.handle_task_status(&MessageEnvelope::task_status(&newer, None).unwrap()).await;
    coordinator.handle_task_status(&MessageEnvelope::task_status(&older, None).unwrap()).await;

    assert_eq!(coordinator.get_task(newer.id).unwrap().progress, 50);
}

#[tokio::test]
async fn fail_worker_marks_failing_and_drives_task_into_recovering() {
    let (coordinator, bus, _store) = wired();
    let mut recovery_sub = bus.subscribe(queue::TASK_CREATED).await;

    let task = TaskBuilder::default().status(TaskStatus::Running).worker_id("w1").progress(70).build();
    coordinator
        .handle_task_status(&MessageEnvelope::task_status(&task, Some(WorkerId::new("w1"))).unwrap())
        .await;

    let heartbeat = WorkerStatusPayload {
        id: WorkerId::new("w1"),
        status: WorkerStatus::Busy,
        task: Some(task.id),
        time: chrono::Utc::now(),
    };
    coordinator.handle_worker_status(&MessageEnvelope::worker_status(&heartbeat).unwrap()).await;

    coordinator.fail_worker(&WorkerId::new("w1")).await.unwrap();

    let worker = coordinator.list_workers().into_iter().find(|w| w.id == WorkerId::new("w1")).unwrap();
    assert_eq!(worker.status, WorkerStatus::Failing);

    let recovering = coordinator.get_task(task.id).unwrap();
    assert_eq!(recovering.status, TaskStatus::Recovering);

    let envelope = recovery_sub.recv().await.unwrap();
    assert_eq!(envelope.msg_type, msg_type::TASK_RECOVERY);
    assert_eq!(envelope.task_id, Some(task.id));
}

#[tokio::test]
async fn terminal_task_is_never_redispatched_by_liveness_sweep() {
    let (coordinator, bus, _store) = wired();
    let mut recovery_sub = bus.subscribe(queue::TASK_CREATED).await;

    let task = TaskBuilder::default().status(TaskStatus::Completed).worker_id("w1").progress(100).build();
    coordinator
        .handle_task_status(&MessageEnvelope::task_status(&task, Some(WorkerId::new("w1"))).unwrap())
        .await;

    let heartbeat = WorkerStatusPayload {
        id: WorkerId::new("w1"),
        status: WorkerStatus::Idle,
        task: Some(task.id),
        time: chrono::Utc::now(),
    };
    coordinator.handle_worker_status(&MessageEnvelope::worker_status(&heartbeat).unwrap()).await;

    coordinator.fail_worker(&WorkerId::new("w1")).await.unwrap();

    let still_completed = coordinator.get_task(task.id).unwrap();
    assert_eq!(still_completed.status, TaskStatus::Completed);

    let timed_out =
        tokio::time::timeout(std::time::Duration::from_millis(20), recovery_sub.recv()).await;
    assert!(timed_out.is_err(), "a completed task must never trigger a recovery dispatch");
}

#[tokio::test]
async fn rehydrate_is_idempotent() {
    let (coordinator, _bus, store) = wired();
    coordinator.create_task("img", 1, Default::default()).await.unwrap();
    coordinator.create_task("video", 2, Default::default()).await.unwrap();

    let push = Arc::new(LocalPushChannel::new());
    let bus2 = Arc::new(LocalBus::new());
    let rehydrated = Coordinator::new(bus2, store, push, FakeClock::new());

    rehydrated.rehydrate().await.unwrap();
    let first_pass = sorted_ids(rehydrated.list_tasks());

    rehydrated.rehydrate().await.unwrap();
    let second_pass = sorted_ids(rehydrated.list_tasks());

    assert_eq!(first_pass, second_pass);
    assert_eq!(first_pass.len(), 2);
}

fn sorted_ids(tasks: Vec<Task>) -> Vec<String> {
    let mut ids: Vec<String> = tasks.iter().map(|t| t.id.to_string()).collect();
    ids.sort();
    ids
}
