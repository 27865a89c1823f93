use super::*;

#[test]
fn idle_worker_is_always_consistent() {
    let w = WorkerRecord::new_idle(WorkerId::new("w1"), Utc::now());
    assert!(w.is_consistent());
}

#[test]
fn busy_worker_without_task_is_inconsistent() {
    let mut w = WorkerRecord::new_idle(WorkerId::new("w1"), Utc::now());
    w.status = WorkerStatus::Busy;
    assert!(!w.is_consistent());
    w.current_task_id = Some(TaskId::new());
    assert!(w.is_consistent());
}

#[test]
fn worker_status_serializes_uppercase() {
    assert_eq!(serde_json::to_string(&WorkerStatus::Failing).unwrap(), "\"FAILING\"");
}

#[test]
fn clamp_downgrades_a_busy_worker_with_no_task_to_idle() {
    let mut w = WorkerRecord::new_idle(WorkerId::new("w1"), Utc::now());
    w.status = WorkerStatus::Busy;
    w.clamp();
    assert_eq!(w.status, WorkerStatus::Idle);
    assert!(w.is_consistent());
}

#[test]
fn clamp_leaves_a_consistent_record_untouched() {
    let mut w = WorkerRecord::new_idle(WorkerId::new("w1"), Utc::now());
    w.status = WorkerStatus::Busy;
    w.current_task_id = Some(TaskId::new());
    w.clamp();
    assert_eq!(w.status, WorkerStatus::Busy);
}
