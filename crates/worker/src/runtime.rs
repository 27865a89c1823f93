//! Cooperative background activities: the bounded intake pipeline, the
//! migration listener, and the heartbeat ticker. Mirrors the coordinator
//! crate's split between core state (`worker.rs`) and the loops that drive it.

use crate::recovery::resume_progress;
use crate::worker::WorkerRuntime;
use fabric_bus::{queue, Bus};
use fabric_core::{msg_type, task_key, Clock, MessageContent, Task};
use fabric_store::StoreJsonExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A unit of work handed from the bus-facing loops to the single executor
/// loop. Distinguishing `Fresh`/`Recovery` up front keeps the executor from
/// having to re-derive it from task status.
enum Dispatch {
    Fresh(Task),
    Recovery(Task),
}

/// Run this worker until cancelled: intake, migration listening, the
/// executor, and the heartbeat ticker all run concurrently and all honor
/// `cancel`.
pub async fn run<C: Clock>(worker: Arc<WorkerRuntime<C>>, cancel: CancellationToken) {
    let (tx, rx) = mpsc::channel::<Dispatch>(worker.config().intake_capacity);

    tokio::join!(
        run_intake(worker.clone(), tx.clone(), cancel.clone()),
        run_migration_listener(worker.clone(), tx, cancel.clone()),
        run_executor(worker.clone(), rx, cancel.clone()),
        run_heartbeat(worker, cancel),
    );
}

/// Consume the work queue carrying both fresh dispatches and recovery
/// redispatches (`task_created` and `task_recovery` share one queue per the
/// wire contract). Competing-consumer delivery means this worker only sees
/// its own share of the traffic.
async fn run_intake<C: Clock>(worker: Arc<WorkerRuntime<C>>, tx: mpsc::Sender<Dispatch>, cancel: CancellationToken) {
    let mut sub = worker.bus().subscribe(queue::TASK_CREATED).await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            received = sub.recv() => {
                match received {
                    Ok(envelope) => {
                        let content = match envelope.decode() {
                            Ok(content) => content,
                            Err(err) => {
                                tracing::warn!(error = %err, "dropping malformed task_created envelope");
                                continue;
                            }
                        };
                        let MessageContent::Task(task) = content else {
                            tracing::warn!("task_created envelope decoded to unexpected content, dropping");
                            continue;
                        };
                        let dispatch = if envelope.msg_type == msg_type::TASK_RECOVERY || task.status == fabric_core::TaskStatus::Recovering {
                            Dispatch::Recovery(*task)
                        } else {
                            Dispatch::Fresh(*task)
                        };
                        if tx.send(dispatch).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "task_created consumer error"),
                }
            }
        }
    }
}

/// Watch `task_status` (fan-out) for migration directives targeting this
/// worker. Every worker sees every directive; only the addressed one acts.
async fn run_migration_listener<C: Clock>(
    worker: Arc<WorkerRuntime<C>>,
    tx: mpsc::Sender<Dispatch>,
    cancel: CancellationToken,
) {
    let mut sub = worker.bus().subscribe(queue::TASK_STATUS).await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            received = sub.recv() => {
                match received {
                    Ok(envelope) if envelope.msg_type == msg_type::TASK_MIGRATION => {
                        let content = match envelope.decode() {
                            Ok(content) => content,
                            Err(err) => {
                                tracing::warn!(error = %err, "dropping malformed task_migration envelope");
                                continue;
                            }
                        };
                        let MessageContent::Migration(directive) = content else { continue };
                        if directive.target_worker_id != *worker.id() {
                            continue;
                        }
                        let Some(task_id) = envelope.task_id else { continue };
                        match worker.store().get_json::<Task>(&task_key(&task_id)).await {
                            Ok(Some(task)) => {
                                if tx.send(Dispatch::Recovery(task)).await.is_err() {
                                    return;
                                }
                            }
                            Ok(None) => tracing::warn!(%task_id, "migration target but task not found in store"),
                            Err(err) => tracing::warn!(%task_id, error = %err, "failed to load migrated task"),
                        }
                    }
                    Ok(_) => continue,
                    Err(err) => tracing::warn!(error = %err, "task_status consumer error"),
                }
            }
        }
    }
}

/// The single executor: one task in flight at a time, pulled off the bounded
/// intake channel in arrival order.
async fn run_executor<C: Clock>(
    worker: Arc<WorkerRuntime<C>>,
    mut rx: mpsc::Receiver<Dispatch>,
    cancel: CancellationToken,
) {
    loop {
        let dispatch = tokio::select! {
            _ = cancel.cancelled() => return,
            dispatch = rx.recv() => match dispatch {
                Some(dispatch) => dispatch,
                None => return,
            },
        };

        match dispatch {
            Dispatch::Fresh(task) => worker.execute_task(task, 0, &cancel).await,
            Dispatch::Recovery(mut task) => {
                let start_progress = match resume_progress(worker.store().as_ref(), &task).await {
                    Ok(progress) => progress,
                    Err(err) => {
                        tracing::warn!(task_id = %task.id, error = %err, "failed to resolve resume progress, starting from 0");
                        0
                    }
                };
                task.progress = start_progress;
                worker.execute_task(task, start_progress, &cancel).await;
            }
        }
    }
}

/// Heartbeat every `heartbeat_interval`, independent of what the worker is
/// currently executing.
async fn run_heartbeat<C: Clock>(worker: Arc<WorkerRuntime<C>>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(worker.config().heartbeat_interval.max(Duration::from_millis(1)));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => worker.publish_heartbeat().await,
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
