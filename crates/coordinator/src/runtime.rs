//! Cooperative background activities: the bus consumer loops and the
//! liveness sweeper. Each honors a shared [`CancellationToken`] rather than
//! an ad-hoc shutdown flag, matching the rest of this codebase's posture on
//! cancellation.

use crate::coordinator::Coordinator;
use fabric_bus::{queue, Bus};
use fabric_core::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default liveness-sweep interval. Short relative to the 30s timeout so a
/// stale worker is caught within a few seconds of crossing the threshold.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Consume `worker_status` until cancelled. A single bad message is logged
/// and dropped; it never stops the loop.
pub async fn run_worker_status_consumer<C: Clock>(
    coordinator: Arc<Coordinator<C>>,
    bus: Arc<dyn Bus>,
    cancel: CancellationToken,
) {
    let mut sub = bus.subscribe(queue::WORKER_STATUS).await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            received = sub.recv() => {
                match received {
                    Ok(envelope) => coordinator.handle_worker_status(&envelope).await,
                    Err(err) => tracing::warn!(error = %err, "worker_status consumer error"),
                }
            }
        }
    }
}

/// Consume `task_status` until cancelled, same posture as the worker_status
/// consumer above.
pub async fn run_task_status_consumer<C: Clock>(
    coordinator: Arc<Coordinator<C>>,
    bus: Arc<dyn Bus>,
    cancel: CancellationToken,
) {
    let mut sub = bus.subscribe(queue::TASK_STATUS).await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            received = sub.recv() => {
                match received {
                    Ok(envelope) => coordinator.handle_task_status(&envelope).await,
                    Err(err) => tracing::warn!(error = %err, "task_status consumer error"),
                }
            }
        }
    }
}

/// Run the liveness sweep on `interval` until cancelled.
pub async fn run_liveness_sweeper<C: Clock>(
    coordinator: Arc<Coordinator<C>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(err) = coordinator.run_liveness_sweep().await {
                    tracing::warn!(error = %err, "liveness sweep failed");
                }
            }
        }
    }
}
