use fabric_bus::BusError;
use fabric_core::{CoreError, TaskId, WorkerId};
use fabric_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("worker {0} not found")]
    WorkerNotFound(WorkerId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Envelope(#[from] CoreError),
}
