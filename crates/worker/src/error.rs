use fabric_bus::BusError;
use fabric_core::CoreError;
use fabric_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Envelope(#[from] CoreError),
}
