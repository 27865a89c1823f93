//! fabric-coordinator: the authoritative task registry, worker roster, and
//! failure-driven recovery/migration dispatch.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod coordinator;
mod error;
mod runtime;

pub use coordinator::{Coordinator, DEFAULT_LIVENESS_TIMEOUT};
pub use error::CoordinatorError;
pub use runtime::{run_liveness_sweeper, run_task_status_consumer, run_worker_status_consumer, DEFAULT_SWEEP_INTERVAL};
